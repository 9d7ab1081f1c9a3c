//! Sources command - list registered data sources

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use super::get_context;
use crate::output;
use gauge_core::SourceType;

#[derive(Serialize)]
struct SourceRow {
    name: String,
    #[serde(rename = "type")]
    source_type: SourceType,
    enabled: bool,
    available: bool,
    indicators: Vec<String>,
    countries: usize,
}

pub fn run(indicator: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    // With an indicator, ask the registry (this already filters on availability)
    let providers: Vec<_> = match indicator {
        Some(indicator) => ctx
            .registry
            .get_for_indicator(indicator)
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect(),
        None => ctx.registry.get_all(),
    };

    let rows: Vec<SourceRow> = providers
        .iter()
        .map(|(name, provider)| SourceRow {
            name: name.clone(),
            source_type: provider.source_type(),
            enabled: provider.is_enabled(),
            available: indicator.is_some() || provider.is_available(),
            indicators: provider.supported_indicators(),
            countries: provider.supported_countries().len(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        match indicator {
            Some(indicator) => {
                output::warning(&format!("No available source supports '{}'", indicator))
            }
            None => output::warning("No data sources registered"),
        }
        return Ok(());
    }

    let yes_no = |flag: bool| {
        if flag {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        }
    };

    let mut table = output::create_table();
    table.set_header(vec!["Source", "Type", "Enabled", "Available", "Indicators", "Countries"]);

    for row in &rows {
        let summary = if row.indicators.len() > 5 {
            format!(
                "{} (+{} more)",
                row.indicators[..5].join(", "),
                row.indicators.len() - 5
            )
        } else {
            row.indicators.join(", ")
        };

        table.add_row(vec![
            row.name.clone(),
            row.source_type.to_string(),
            yes_no(row.enabled),
            yes_no(row.available),
            summary,
            row.countries.to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}
