//! Cache command - inspect or clear the response cache

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::load_config;
use crate::output;
use gauge_core::services::CacheManager;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show cache strategy and entry counts
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every cached response
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: CacheCommands) -> Result<()> {
    // The cache does not need providers, so skip building the full context
    let config = load_config()?;
    let cache = CacheManager::new(&config.cache);

    match command {
        CacheCommands::Stats { json } => {
            let stats = cache.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }

            println!("{}", "Cache".bold());
            println!();

            let mut table = output::create_table();
            table.add_row(vec!["Enabled", if stats.enabled { "yes" } else { "no" }]);
            table.add_row(vec!["Strategy", stats.strategy.as_str()]);
            table.add_row(vec!["Directory", &stats.dir.display().to_string()]);
            table.add_row(vec!["Memory entries", &stats.memory_entries.to_string()]);
            table.add_row(vec!["Disk entries", &stats.disk_entries.to_string()]);
            println!("{}", table);

            if !stats.enabled {
                output::warning("Caching is disabled; set GAUGE_CACHE_DISABLED=0 or edit settings.json");
            }
        }
        CacheCommands::Clear { json } => {
            let removed = cache.clear();
            if json {
                println!("{}", serde_json::json!({ "removed": removed }));
            } else if removed == 0 {
                output::info("Cache already empty");
            } else {
                output::success(&format!("Removed {} cached response(s)", removed));
            }
        }
    }

    Ok(())
}
