//! CLI command implementations

pub mod cache;
pub mod config;
pub mod fetch;
pub mod sources;

use std::path::PathBuf;

use anyhow::{Context, Result};
use gauge_core::config::Config;
use gauge_core::GaugeContext;

/// Get the gauge home directory (`GAUGE_HOME` or `~/.gauge`)
pub fn get_gauge_home() -> PathBuf {
    Config::default_home()
}

/// Load the configuration without building providers
pub fn load_config() -> Result<Config> {
    let home = get_gauge_home();
    Config::load(&home).with_context(|| format!("Failed to load settings from {:?}", home))
}

/// Get or create the gauge context
pub fn get_context() -> Result<GaugeContext> {
    let home = get_gauge_home();

    std::fs::create_dir_all(&home)
        .with_context(|| format!("Failed to create gauge directory: {:?}", home))?;

    GaugeContext::new(&home).context("Failed to initialize gauge context")
}
