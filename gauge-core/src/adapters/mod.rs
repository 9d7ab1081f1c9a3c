//! Adapter implementations
//!
//! Adapters implement the `DataSource` port with concrete technologies:
//! - Local CSV / spreadsheet files
//! - World Bank Indicators REST API

pub mod file;
pub mod world_bank;

#[cfg(test)]
pub mod world_bank_mock;
