//! Data point domain model

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// How trustworthy a single observation is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Official,
    Estimated,
    Interpolated,
    #[default]
    Unknown,
}

impl DataQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataQuality::Official => "official",
            DataQuality::Estimated => "estimated",
            DataQuality::Interpolated => "interpolated",
            DataQuality::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DataQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient parse: anything unrecognised is `Unknown`
impl FromStr for DataQuality {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "official" => DataQuality::Official,
            "estimated" => DataQuality::Estimated,
            "interpolated" => DataQuality::Interpolated,
            _ => DataQuality::Unknown,
        })
    }
}

/// A single observation of an indicator for a country
///
/// Fields are private so a point cannot change after construction;
/// the `with_*` methods consume and return a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    value: f64,
    timestamp: DateTime<Utc>,
    country: String,
    indicator: String,
    source: String,
    #[serde(default)]
    quality: DataQuality,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, JsonValue>,
}

impl DataPoint {
    /// Create a new data point with unknown quality and no unit
    pub fn new(
        value: f64,
        timestamp: DateTime<Utc>,
        country: impl Into<String>,
        indicator: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            value,
            timestamp,
            country: country.into(),
            indicator: indicator.into(),
            source: source.into(),
            quality: DataQuality::Unknown,
            unit: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_quality(mut self, quality: DataQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_unit(mut self, unit: Option<String>) -> Self {
        self.unit = unit.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn indicator(&self) -> &str {
        &self.indicator
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn quality(&self) -> DataQuality {
        self.quality
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn metadata(&self) -> &HashMap<String, JsonValue> {
        &self.metadata
    }
}

/// Normalize a calendar year to December 31 of that year (midnight UTC)
///
/// Annual series report a year rather than a date; pinning them to the
/// last day keeps range filters and ordering consistent across providers.
pub fn year_end(year: i32) -> Option<DateTime<Utc>> {
    let midnight = NaiveDate::from_ymd_opt(year, 12, 31)?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_quality_parse_is_lenient() {
        assert_eq!("Official".parse::<DataQuality>().unwrap(), DataQuality::Official);
        assert_eq!(" estimated ".parse::<DataQuality>().unwrap(), DataQuality::Estimated);
        assert_eq!("guess".parse::<DataQuality>().unwrap(), DataQuality::Unknown);
    }

    #[test]
    fn test_year_end() {
        let ts = year_end(2020).unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2020, 12, 31));
    }

    #[test]
    fn test_blank_unit_dropped() {
        let point = DataPoint::new(1.0, Utc::now(), "usa", "gdp", "test")
            .with_unit(Some("  ".to_string()));
        assert!(point.unit().is_none());

        let point = point.with_unit(Some("USD".to_string()));
        assert_eq!(point.unit(), Some("USD"));
    }

    #[test]
    fn test_serde_roundtrip_keeps_metadata() {
        let point = DataPoint::new(3.5, year_end(2019).unwrap(), "deu", "inflation", "world_bank")
            .with_quality(DataQuality::Official)
            .with_metadata("country_name", "Germany");

        let json = serde_json::to_string(&point).unwrap();
        let back: DataPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, point);
        assert_eq!(back.metadata()["country_name"], "Germany");
    }
}
