//! Acquisition service - cache first, then providers
//!
//! Resolves the candidate providers for a request, serves a cache hit if
//! one exists, otherwise asks each candidate in turn and caches the first
//! successful response with a TTL derived from the provider's update
//! frequency.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::{elapsed_ms, DataRequest, DataResponse};
use crate::ports::DataSource;
use crate::services::cache::CacheManager;
use crate::services::registry::DataSourceRegistry;

/// Source name reported when no provider could be selected
const NO_SOURCE: &str = "none";

/// Fetch orchestration over a registry and a cache
pub struct AcquisitionService {
    registry: Arc<DataSourceRegistry>,
    cache: Arc<CacheManager>,
}

impl AcquisitionService {
    pub fn new(registry: Arc<DataSourceRegistry>, cache: Arc<CacheManager>) -> Self {
        Self { registry, cache }
    }

    pub fn registry(&self) -> &DataSourceRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Fetch a series
    ///
    /// With `use_cache == false` the cache is not consulted, but a fresh
    /// successful response still replaces the cached entry.
    pub fn fetch(&self, request: &DataRequest) -> DataResponse {
        let started = Instant::now();

        let candidates = match self.candidates(request) {
            Ok(candidates) => candidates,
            Err(message) => {
                debug!(country = %request.country, indicator = %request.indicator, "{}", message);
                let source = request.source.as_deref().unwrap_or(NO_SOURCE);
                return DataResponse::fail(message, source, elapsed_ms(started));
            }
        };

        if request.use_cache {
            for provider in &candidates {
                if let Some(hit) = self.cache.get(&request.country, &request.indicator, provider.name()) {
                    debug!(
                        country = %request.country,
                        indicator = %request.indicator,
                        source = provider.name(),
                        "Serving from cache"
                    );
                    return hit;
                }
            }
        }

        let mut last_failure = None;
        for provider in &candidates {
            let response = provider.fetch_data(request);

            if response.is_success() {
                info!(
                    country = %request.country,
                    indicator = %request.indicator,
                    source = provider.name(),
                    points = response.data().map(|s| s.len()).unwrap_or(0),
                    fetch_time_ms = response.fetch_time_ms,
                    "Fetched series"
                );
                let frequency = provider.get_data_frequency(&request.indicator);
                let mut stored = response.clone();
                self.cache
                    .set(&mut stored, &request.country, &request.indicator, None, Some(frequency));
                return response;
            }

            warn!(
                country = %request.country,
                indicator = %request.indicator,
                source = provider.name(),
                error = response.error().unwrap_or_default(),
                "Provider failed"
            );
            last_failure = Some(response);
        }

        last_failure.unwrap_or_else(|| {
            DataResponse::fail("No data source produced a response", NO_SOURCE, elapsed_ms(started))
        })
    }

    /// Providers to try, in order
    ///
    /// A named source is used alone. Otherwise every registered provider that
    /// supports the indicator and accepts the request, in name order.
    fn candidates(&self, request: &DataRequest) -> Result<Vec<Arc<dyn DataSource>>, String> {
        if let Some(name) = &request.source {
            return self
                .registry
                .get(name)
                .map(|provider| vec![provider])
                .ok_or_else(|| format!("Unknown data source '{}'", name));
        }

        let candidates: Vec<_> = self
            .registry
            .get_all()
            .into_iter()
            .map(|(_, provider)| provider)
            .filter(|p| p.supports_indicator(&request.indicator) && p.validate_request(request))
            .collect();

        if candidates.is_empty() {
            return Err(format!(
                "No data source supports indicator '{}' for country '{}'",
                request.indicator, request.country
            ));
        }
        Ok(candidates)
    }
}
