//! Core domain entities
//!
//! Pure data structures with their invariants - no I/O.

mod data_point;
mod frequency;
mod request;
pub mod result;
mod time_series;

pub use data_point::{year_end, DataPoint, DataQuality};
pub use frequency::DataFrequency;
pub use request::{elapsed_ms, DataRequest, DataResponse};
pub use time_series::{IndicatorCategory, TimeSeries};

pub(crate) use time_series::in_range;
