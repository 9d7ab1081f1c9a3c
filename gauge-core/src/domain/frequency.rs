//! Update cadence of an indicator and the cache lifetime derived from it

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::result::Error;

const HOUR: u64 = 3_600;
const DAY: u64 = 24 * HOUR;

/// How often a data series is updated at its origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFrequency {
    Static,
    Annual,
    Quarterly,
    Monthly,
    Weekly,
    Daily,
}

impl DataFrequency {
    pub const ALL: &'static [DataFrequency] = &[
        DataFrequency::Static,
        DataFrequency::Annual,
        DataFrequency::Quarterly,
        DataFrequency::Monthly,
        DataFrequency::Weekly,
        DataFrequency::Daily,
    ];

    /// Default cache lifetime for a series with this cadence
    pub fn ttl(&self) -> Duration {
        let secs = match self {
            DataFrequency::Static => 30 * DAY,
            DataFrequency::Annual => 7 * DAY,
            DataFrequency::Quarterly => 3 * DAY,
            DataFrequency::Monthly => DAY,
            DataFrequency::Weekly => 6 * HOUR,
            DataFrequency::Daily => HOUR,
        };
        Duration::from_secs(secs)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataFrequency::Static => "static",
            DataFrequency::Annual => "annual",
            DataFrequency::Quarterly => "quarterly",
            DataFrequency::Monthly => "monthly",
            DataFrequency::Weekly => "weekly",
            DataFrequency::Daily => "daily",
        }
    }
}

impl fmt::Display for DataFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataFrequency::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::validation(format!("Unknown data frequency: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slower_cadence_lives_longer() {
        let ttls: Vec<Duration> = DataFrequency::ALL.iter().map(|f| f.ttl()).collect();
        assert!(ttls.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_annual_ttl() {
        assert_eq!(DataFrequency::Annual.ttl(), Duration::from_secs(604_800));
        assert_eq!(DataFrequency::Monthly.ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_parse() {
        assert_eq!("Quarterly".parse::<DataFrequency>().unwrap(), DataFrequency::Quarterly);
        assert!("hourly".parse::<DataFrequency>().is_err());
    }
}
