//! Gauge Core - resilient acquisition of indicator time series
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: Value objects (DataPoint, TimeSeries, DataRequest, DataResponse)
//! - **ports**: The `DataSource` provider trait
//! - **services**: Provider registry, response cache, acquisition orchestration
//! - **adapters**: Concrete providers (local files, World Bank API)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use adapters::file::FileDataSource;
use adapters::world_bank::WorldBankDataSource;
use config::Config;
use services::{AcquisitionService, CacheManager, DataSourceRegistry};

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    DataFrequency, DataPoint, DataQuality, DataRequest, DataResponse, IndicatorCategory,
    TimeSeries,
};
pub use ports::{DataSource, SourceType};

/// Main context for Gauge operations
///
/// Built once per process. Holds the configuration, the provider registry,
/// the cache and the acquisition service wired over both.
pub struct GaugeContext {
    pub config: Config,
    pub registry: Arc<DataSourceRegistry>,
    pub cache: Arc<CacheManager>,
    pub acquisition: AcquisitionService,
}

impl GaugeContext {
    /// Load configuration from `home` and build the context
    pub fn new(home: &Path) -> Result<Self> {
        let config = Config::load(home)?;
        Self::from_config(config)
    }

    /// Build the context from an already loaded configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let registry = Arc::new(DataSourceRegistry::new());

        let file_source = FileDataSource::from_config(&config.file_source);
        registry.register(Arc::new(file_source));

        let world_bank = WorldBankDataSource::new(&config.world_bank)?;
        registry.register(Arc::new(world_bank));

        let cache = Arc::new(CacheManager::new(&config.cache));
        let acquisition = AcquisitionService::new(Arc::clone(&registry), Arc::clone(&cache));

        info!(
            home = %config.home.display(),
            providers = registry.len(),
            cache = %config.cache.strategy,
            "Gauge context ready"
        );

        Ok(Self {
            config,
            registry,
            cache,
            acquisition,
        })
    }

    /// Shorthand for `self.acquisition.fetch(request)`
    pub fn fetch(&self, request: &DataRequest) -> DataResponse {
        self.acquisition.fetch(request)
    }
}
