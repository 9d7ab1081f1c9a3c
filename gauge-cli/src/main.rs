//! Gauge CLI - indicator time series in your terminal

use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{cache, config, fetch, sources};

/// Gauge - fetch indicator time series from local files and the World Bank
#[derive(Parser)]
#[command(name = "gauge", version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr (overridden by GAUGE_LOG / RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an indicator series for a country
    Fetch {
        /// Country code (e.g., usa, DE)
        country: String,
        /// Indicator name or provider code (e.g., gdp, SP.POP.TOTL)
        indicator: String,
        /// Use only this data source
        #[arg(long, short)]
        source: Option<String>,
        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Skip the cache lookup (the fresh result is still cached)
        #[arg(long)]
        no_cache: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered data sources
    Sources {
        /// Only sources that support this indicator and are available now
        #[arg(long, short)]
        indicator: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or clear the response cache
    Cache {
        #[command(subcommand)]
        command: cache::CacheCommands,
    },

    /// Show the resolved configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "gauge_core=debug,gauge=debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_env("GAUGE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Fetch { country, indicator, source, start, end, no_cache, json } => {
            fetch::run(fetch::FetchArgs { country, indicator, source, start, end, no_cache }, json)
        }
        Commands::Sources { indicator, json } => sources::run(indicator.as_deref(), json),
        Commands::Cache { command } => cache::run(command),
        Commands::Config { json } => config::run(json),
    }
}
