//! Service layer - data acquisition orchestration
//!
//! The registry resolves providers, the cache stores their responses, and
//! the acquisition service ties the two together.

pub mod acquisition;
pub mod cache;
pub mod registry;

pub use acquisition::AcquisitionService;
pub use cache::{CacheManager, CacheStats, CacheStrategy};
pub use registry::DataSourceRegistry;
