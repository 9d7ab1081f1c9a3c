//! Config command - show the resolved configuration

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::{get_gauge_home, load_config};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let config = load_config()?;
    let settings_path = get_gauge_home().join("settings.json");

    let view = json!({
        "home": config.home,
        "settingsFile": settings_path,
        "settingsFileExists": settings_path.exists(),
        "cache": {
            "enabled": config.cache.enabled,
            "strategy": config.cache.strategy,
            "dir": config.cache.dir,
            "defaultTtlSecs": config.cache.default_ttl.as_secs(),
            "maxMemoryEntries": config.cache.max_memory_entries,
        },
        "file": {
            "enabled": config.file_source.enabled,
            "dir": config.file_source.dir,
        },
        "worldBank": {
            "enabled": config.world_bank.enabled,
            "baseUrl": config.world_bank.base_url,
            "timeoutSecs": config.world_bank.timeout.as_secs(),
            "maxRetries": config.world_bank.max_retries,
            "retryDelayMs": config.world_bank.retry_delay.as_millis() as u64,
        },
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{}", "Gauge Configuration".bold());
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec!["home".to_string(), config.home.display().to_string()]);
    table.add_row(vec!["cache.enabled".to_string(), config.cache.enabled.to_string()]);
    table.add_row(vec!["cache.strategy".to_string(), config.cache.strategy.to_string()]);
    table.add_row(vec!["cache.dir".to_string(), config.cache.dir.display().to_string()]);
    table.add_row(vec![
        "cache.default_ttl_secs".to_string(),
        config.cache.default_ttl.as_secs().to_string(),
    ]);
    table.add_row(vec![
        "cache.max_memory_entries".to_string(),
        config.cache.max_memory_entries.to_string(),
    ]);
    table.add_row(vec!["file.enabled".to_string(), config.file_source.enabled.to_string()]);
    table.add_row(vec!["data.dir".to_string(), config.file_source.dir.display().to_string()]);
    table.add_row(vec!["world_bank.enabled".to_string(), config.world_bank.enabled.to_string()]);
    table.add_row(vec!["world_bank.base_url".to_string(), config.world_bank.base_url.clone()]);
    table.add_row(vec![
        "world_bank.timeout_secs".to_string(),
        config.world_bank.timeout.as_secs().to_string(),
    ]);
    table.add_row(vec![
        "world_bank.max_retries".to_string(),
        config.world_bank.max_retries.to_string(),
    ]);
    table.add_row(vec![
        "world_bank.retry_delay_ms".to_string(),
        config.world_bank.retry_delay.as_millis().to_string(),
    ]);
    println!("{}", table);

    if !settings_path.exists() {
        println!();
        output::info(&format!("No settings file at {}; using defaults", settings_path.display()));
    }

    Ok(())
}
