//! Integration tests for the acquisition path
//!
//! These tests wire a real context (file provider, disk-backed cache) over
//! temporary directories. The World Bank provider is disabled so no test
//! touches the network.
//!
//! Run with: cargo test --test acquisition_tests -- --nocapture

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use gauge_core::adapters::file::FileDataSource;
use gauge_core::config::Config;
use gauge_core::services::{CacheStrategy, DataSourceRegistry};
use gauge_core::{DataRequest, DataSource, GaugeContext};

// ============================================================================
// Test Helpers
// ============================================================================

/// Write a dataset into the data directory
fn write_dataset(data_dir: &Path, name: &str, content: &str) {
    std::fs::create_dir_all(data_dir).unwrap();
    std::fs::write(data_dir.join(name), content).unwrap();
}

/// Offline configuration rooted at `home` with the given cache strategy
fn offline_config(home: &Path, strategy: &str) -> Config {
    let values: HashMap<String, String> = [
        ("cache.strategy", strategy),
        ("cache.dir", "cache"),
        ("data.dir", "data"),
        ("world_bank.enabled", "false"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Config::from_flat_map(home, &values).expect("valid config")
}

fn gdp_csv() -> &'static str {
    "date,value,unit\n2019,21.4,trillion USD\n2020,20.9,trillion USD\n2021,23.3,trillion USD\n"
}

// ============================================================================
// Fetch Contract
// ============================================================================

#[test]
fn test_fetch_through_context() {
    let home = TempDir::new().unwrap();
    write_dataset(&home.path().join("data"), "gdp_usa.csv", gdp_csv());

    let ctx = GaugeContext::from_config(offline_config(home.path(), "hybrid")).unwrap();
    let response = ctx.fetch(&DataRequest::new("usa", "gdp"));

    assert!(response.is_success(), "error: {:?}", response.error());
    assert!(response.error().is_none());
    assert_eq!(response.source, "file");
    let series = response.data().unwrap();
    assert_eq!(series.values(), vec![21.4, 20.9, 23.3]);
    assert!(series.points().iter().all(|p| p.country() == "usa" && p.indicator() == "gdp"));
}

#[test]
fn test_failure_carries_error_and_no_data() {
    let home = TempDir::new().unwrap();
    write_dataset(&home.path().join("data"), "gdp_usa.csv", gdp_csv());
    write_dataset(&home.path().join("data"), "population_fra.csv", "date,value\n2020,67\n");

    let ctx = GaugeContext::from_config(offline_config(home.path(), "memory")).unwrap();
    // Both halves are known to the file provider, the pair is not
    let response = ctx.fetch(&DataRequest::new("fra", "gdp"));

    assert!(!response.is_success());
    assert!(response.data().is_none());
    assert!(!response.error().unwrap().is_empty());
}

#[test]
fn test_disabled_world_bank_is_registered_but_unavailable() {
    let home = TempDir::new().unwrap();
    let ctx = GaugeContext::from_config(offline_config(home.path(), "memory")).unwrap();

    let world_bank = ctx.registry.get("world_bank").expect("registered");
    assert!(!world_bank.is_enabled());
    assert!(!world_bank.is_available());

    let response = ctx.fetch(&DataRequest::new("usa", "gdp").with_source("world_bank"));
    assert!(!response.is_success());
    assert!(response.error().unwrap().contains("disabled"));
}

// ============================================================================
// Caching Through the Context
// ============================================================================

#[test]
fn test_disk_cache_survives_context_restart() {
    let home = TempDir::new().unwrap();
    let data_dir = home.path().join("data");
    write_dataset(&data_dir, "gdp_usa.csv", gdp_csv());

    let first = GaugeContext::from_config(offline_config(home.path(), "disk")).unwrap();
    let fetched = first.fetch(&DataRequest::new("usa", "gdp"));
    assert!(fetched.is_success());
    assert!(!fetched.is_cached());
    drop(first);

    // Rewrite the dataset: a cache hit still returns the old values
    write_dataset(&data_dir, "gdp_usa.csv", "date,value\n2021,99.0\n");

    let second = GaugeContext::from_config(offline_config(home.path(), "disk")).unwrap();
    let cached = second.fetch(&DataRequest::new("usa", "gdp"));

    assert!(cached.is_success(), "error: {:?}", cached.error());
    assert!(cached.is_cached());
    assert_eq!(cached.data(), fetched.data());
}

#[test]
fn test_every_strategy_round_trips() {
    for strategy in ["memory", "disk", "hybrid"] {
        let home = TempDir::new().unwrap();
        write_dataset(&home.path().join("data"), "gdp_usa.csv", gdp_csv());

        let config = offline_config(home.path(), strategy);
        assert_eq!(config.cache.strategy, strategy.parse::<CacheStrategy>().unwrap());
        let ctx = GaugeContext::from_config(config).unwrap();

        let fresh = ctx.fetch(&DataRequest::new("usa", "gdp"));
        let again = ctx.fetch(&DataRequest::new("usa", "gdp"));

        assert!(again.is_cached(), "strategy {}", strategy);
        assert_eq!(again.data(), fresh.data(), "strategy {}", strategy);
        assert_eq!(again.source, fresh.source, "strategy {}", strategy);
    }
}

#[test]
fn test_cache_clear_forces_refetch() {
    let home = TempDir::new().unwrap();
    write_dataset(&home.path().join("data"), "gdp_usa.csv", gdp_csv());
    let ctx = GaugeContext::from_config(offline_config(home.path(), "hybrid")).unwrap();

    ctx.fetch(&DataRequest::new("usa", "gdp"));
    assert_eq!(ctx.cache.stats().disk_entries, 1);

    // Memory copy plus disk file
    assert_eq!(ctx.cache.clear(), 2);
    assert_eq!(ctx.cache.clear(), 0);

    let response = ctx.fetch(&DataRequest::new("usa", "gdp"));
    assert!(!response.is_cached());
}

// ============================================================================
// Registry Discovery
// ============================================================================

#[test]
fn test_get_for_indicator_with_file_providers() {
    let present = TempDir::new().unwrap();
    write_dataset(present.path(), "gdp_usa.csv", gdp_csv());
    let missing = TempDir::new().unwrap();

    let registry = DataSourceRegistry::new();
    registry.register_as("present", Arc::new(FileDataSource::new(present.path(), true)));
    registry.register_as(
        "missing",
        Arc::new(FileDataSource::new(&missing.path().join("nope"), true)),
    );

    let found = registry.get_for_indicator("gdp");
    assert_eq!(found.len(), 1);
    assert!(found[0].supports_indicator("GDP"));

    assert!(registry.get_for_indicator("population").is_empty());
}
