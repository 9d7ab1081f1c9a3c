//! Fetch command - retrieve an indicator series

use anyhow::{bail, Result};
use chrono::NaiveDate;
use colored::Colorize;

use super::get_context;
use crate::output;
use gauge_core::DataRequest;

pub struct FetchArgs {
    pub country: String,
    pub indicator: String,
    pub source: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub no_cache: bool,
}

impl FetchArgs {
    fn into_request(self) -> DataRequest {
        let mut request = DataRequest::new(self.country, self.indicator).with_range(self.start, self.end);
        if let Some(source) = self.source {
            request = request.with_source(source);
        }
        if self.no_cache {
            request = request.without_cache();
        }
        request
    }
}

pub fn run(args: FetchArgs, json: bool) -> Result<()> {
    if let (Some(start), Some(end)) = (args.start, args.end) {
        if start > end {
            bail!("--start ({}) is after --end ({})", start, end);
        }
    }

    let ctx = get_context()?;
    let request = args.into_request();
    let response = ctx.fetch(&request);

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        if !response.is_success() {
            bail!("Fetch failed");
        }
        return Ok(());
    }

    let Some(series) = response.data() else {
        bail!(
            "Fetch failed ({}): {}",
            response.source,
            response.error().unwrap_or("Unknown error")
        );
    };

    let origin = if response.is_cached() {
        "cache".yellow().to_string()
    } else {
        output::format_ms(response.fetch_time_ms)
    };
    println!(
        "{} for {} from {} ({})",
        series.indicator.bold(),
        series.country.bold(),
        response.source,
        origin
    );
    if let Some(category) = series.category {
        println!("Category: {}", category);
    }
    println!();

    if series.is_empty() {
        output::warning("No observations in the requested range");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Value", "Unit", "Quality"]);
    for point in series.sorted_by_time().points() {
        table.add_row(vec![
            point.timestamp().format("%Y-%m-%d").to_string(),
            output::format_value(point.value()),
            point.unit().unwrap_or("").to_string(),
            point.quality().to_string(),
        ]);
    }
    println!("{}", table);

    if let Some(skipped) = response.metadata.get("rows_skipped").and_then(|v| v.as_u64()) {
        if skipped > 0 {
            output::warning(&format!("{} malformed row(s) skipped", skipped));
        }
    }

    Ok(())
}
