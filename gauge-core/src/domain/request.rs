//! Request and response value objects for the fetch contract

use std::collections::HashMap;
use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::result::Result;
use super::time_series::TimeSeries;

/// What a caller wants: one indicator for one country, optionally bounded in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRequest {
    pub country: String,
    pub indicator: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Provider name to use; `None` lets the registry pick
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    #[serde(default)]
    pub metadata: HashMap<String, JsonValue>,
}

fn default_use_cache() -> bool {
    true
}

impl DataRequest {
    pub fn new(country: impl Into<String>, indicator: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            indicator: indicator.into(),
            start_date: None,
            end_date: None,
            source: None,
            use_cache: true,
            metadata: HashMap::new(),
        }
    }

    pub fn with_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn has_range(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

/// Outcome of a fetch, successful or not
///
/// Build through [`DataResponse::ok`] or [`DataResponse::fail`]; a failed
/// response never carries data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    data: Option<TimeSeries>,
    success: bool,
    error: Option<String>,
    pub source: String,
    cached: bool,
    pub fetch_time_ms: f64,
    #[serde(default)]
    pub metadata: HashMap<String, JsonValue>,
}

impl DataResponse {
    /// Create a successful response
    pub fn ok(series: TimeSeries, source: impl Into<String>, fetch_time_ms: f64) -> Self {
        Self {
            data: Some(series),
            success: true,
            error: None,
            source: source.into(),
            cached: false,
            fetch_time_ms,
            metadata: HashMap::new(),
        }
    }

    /// Create a failed response
    ///
    /// An empty message is replaced so that failures always explain themselves.
    pub fn fail(error: impl Into<String>, source: impl Into<String>, fetch_time_ms: f64) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "Unknown error".to_string();
        }
        Self {
            data: None,
            success: false,
            error: Some(error),
            source: source.into(),
            cached: false,
            fetch_time_ms,
            metadata: HashMap::new(),
        }
    }

    /// Convert a provider-internal result into a response, timing from `started`
    pub fn from_result(result: Result<TimeSeries>, source: &str, started: Instant) -> Self {
        let elapsed = elapsed_ms(started);
        match result {
            Ok(series) => Self::ok(series, source, elapsed),
            Err(e) => Self::fail(e.to_string(), source, elapsed),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn data(&self) -> Option<&TimeSeries> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<TimeSeries> {
        self.data
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether this response was served from (or stored into) the cache
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub(crate) fn mark_cached(&mut self) {
        self.cached = true;
    }

    /// Rebuild a response from its persisted parts, re-checking the success invariant
    pub(crate) fn restore(
        success: bool,
        data: Option<TimeSeries>,
        error: Option<String>,
        source: String,
        fetch_time_ms: f64,
    ) -> Self {
        let mut response = if success {
            match data {
                Some(series) => Self::ok(series, source, fetch_time_ms),
                None => Self::fail("Cached response has no data", source, fetch_time_ms),
            }
        } else {
            Self::fail(error.unwrap_or_default(), source, fetch_time_ms)
        };
        response.cached = true;
        response
    }
}

/// Milliseconds elapsed since `started`
pub fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
