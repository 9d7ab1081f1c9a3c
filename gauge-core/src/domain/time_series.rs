//! Time series domain model

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::data_point::DataPoint;
use super::result::{Error, Result};

/// Broad thematic grouping of an indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorCategory {
    Economic,
    Social,
    Environmental,
    Health,
    Education,
    Governance,
    Infrastructure,
}

impl IndicatorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorCategory::Economic => "economic",
            IndicatorCategory::Social => "social",
            IndicatorCategory::Environmental => "environmental",
            IndicatorCategory::Health => "health",
            IndicatorCategory::Education => "education",
            IndicatorCategory::Governance => "governance",
            IndicatorCategory::Infrastructure => "infrastructure",
        }
    }
}

impl fmt::Display for IndicatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "economic" => Ok(IndicatorCategory::Economic),
            "social" => Ok(IndicatorCategory::Social),
            "environmental" => Ok(IndicatorCategory::Environmental),
            "health" => Ok(IndicatorCategory::Health),
            "education" => Ok(IndicatorCategory::Education),
            "governance" => Ok(IndicatorCategory::Governance),
            "infrastructure" => Ok(IndicatorCategory::Infrastructure),
            other => Err(Error::validation(format!("Unknown indicator category: {}", other))),
        }
    }
}

/// Ordered collection of observations for one (country, indicator, source)
///
/// Points keep insertion order; they are not necessarily sorted by time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub country: String,
    pub indicator: String,
    pub source: String,
    #[serde(default)]
    pub category: Option<IndicatorCategory>,
    #[serde(default)]
    points: Vec<DataPoint>,
    #[serde(default)]
    pub metadata: HashMap<String, JsonValue>,
}

impl TimeSeries {
    /// Create an empty series
    pub fn new(
        country: impl Into<String>,
        indicator: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            indicator: indicator.into(),
            source: source.into(),
            category: None,
            points: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_category(mut self, category: Option<IndicatorCategory>) -> Self {
        self.category = category;
        self
    }

    /// Append a point, rejecting one that belongs to another country or indicator
    pub fn push(&mut self, point: DataPoint) -> Result<()> {
        if point.country() != self.country || point.indicator() != self.indicator {
            return Err(Error::validation(format!(
                "Point for {}/{} does not belong to series {}/{}",
                point.country(),
                point.indicator(),
                self.country,
                self.indicator
            )));
        }
        self.points.push(point);
        Ok(())
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Values in insertion order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value()).collect()
    }

    /// The most recent observation by timestamp
    pub fn latest(&self) -> Option<&DataPoint> {
        self.points.iter().max_by_key(|p| p.timestamp())
    }

    /// A copy of this series with points ordered by timestamp
    pub fn sorted_by_time(&self) -> TimeSeries {
        let mut sorted = self.clone();
        sorted.points.sort_by_key(|p| p.timestamp());
        sorted
    }

    /// A copy holding only points whose date falls inside the inclusive range
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> TimeSeries {
        let mut filtered = self.clone();
        filtered
            .points
            .retain(|p| in_range(p.timestamp(), start, end));
        filtered
    }
}

pub(crate) fn in_range(ts: DateTime<Utc>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    let date = ts.date_naive();
    start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::data_point::year_end;

    fn point(value: f64, year: i32) -> DataPoint {
        DataPoint::new(value, year_end(year).unwrap(), "usa", "gdp", "test")
    }

    #[test]
    fn test_push_rejects_foreign_point() {
        let mut series = TimeSeries::new("usa", "gdp", "test");
        series.push(point(1.0, 2020)).unwrap();

        let foreign = DataPoint::new(2.0, year_end(2020).unwrap(), "fra", "gdp", "test");
        assert!(series.push(foreign).is_err());
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_insertion_order_kept() {
        let mut series = TimeSeries::new("usa", "gdp", "test");
        series.push(point(3.0, 2022)).unwrap();
        series.push(point(1.0, 2020)).unwrap();
        series.push(point(2.0, 2021)).unwrap();

        assert_eq!(series.values(), vec![3.0, 1.0, 2.0]);
        assert_eq!(series.sorted_by_time().values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.latest().unwrap().value(), 3.0);
    }

    #[test]
    fn test_between_is_inclusive() {
        let mut series = TimeSeries::new("usa", "gdp", "test");
        for (i, year) in (2018..=2022).enumerate() {
            series.push(point(i as f64, year)).unwrap();
        }

        let start = NaiveDate::from_ymd_opt(2019, 12, 31);
        let end = NaiveDate::from_ymd_opt(2021, 12, 31);
        assert_eq!(series.between(start, end).len(), 3);
        assert_eq!(series.between(None, end).len(), 4);
        assert_eq!(series.between(None, None).len(), 5);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Health".parse::<IndicatorCategory>().unwrap(), IndicatorCategory::Health);
        assert!("sports".parse::<IndicatorCategory>().is_err());
    }
}
