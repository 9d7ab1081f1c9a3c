//! Data source provider port
//!
//! Defines the interface every indicator provider implements (local files,
//! the World Bank API, ...). The registry and the acquisition service work
//! only with this trait, never with concrete providers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{DataFrequency, DataRequest, DataResponse};

/// Kind of backing store a provider reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    File,
    Api,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::File => f.write_str("file"),
            SourceType::Api => f.write_str("api"),
        }
    }
}

/// Indicator data provider trait
///
/// Implementations translate a source-specific format into the canonical
/// `TimeSeries` model and apply their own retry policy.
pub trait DataSource: Send + Sync {
    /// Provider name used for registry lookup and cache keys (e.g., "world_bank")
    fn name(&self) -> &str;

    fn source_type(&self) -> SourceType;

    /// Whether the provider was enabled at construction time
    ///
    /// A disabled provider stays registered but answers every fetch with a
    /// "source unavailable" failure.
    fn is_enabled(&self) -> bool;

    fn supported_indicators(&self) -> Vec<String>;

    fn supported_countries(&self) -> Vec<String>;

    /// True only if the indicator and country are known to this provider
    ///
    /// Does not guarantee that data exists for the pair.
    fn validate_request(&self, request: &DataRequest) -> bool;

    /// Fetch a series
    ///
    /// Never fails at the call level: every failure mode is reported as a
    /// response with `success == false` and a populated error message.
    /// `fetch_time_ms` covers the whole call, retries included.
    fn fetch_data(&self, request: &DataRequest) -> DataResponse;

    /// Liveness check
    ///
    /// Remote providers may issue a real request here, so callers should not
    /// invoke it in hot paths.
    fn is_available(&self) -> bool;

    /// Native update cadence of an indicator, used to choose a cache TTL
    fn get_data_frequency(&self, indicator: &str) -> DataFrequency;

    fn supports_indicator(&self, indicator: &str) -> bool {
        let wanted = indicator.to_lowercase();
        self.supported_indicators()
            .iter()
            .any(|i| i.to_lowercase() == wanted)
    }
}
