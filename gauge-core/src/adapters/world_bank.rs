//! World Bank Indicators API client
//!
//! Fetches annual indicator series from the World Bank v2 REST API.
//! Requests are addressed by World Bank country and indicator codes,
//! resolved from the static tables in [`codes`].
//!
//! API Documentation: https://datahelpdesk.worldbank.org/knowledgebase/articles/889392

pub mod codes;

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::{Datelike, Utc};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::WorldBankConfig;
use crate::domain::result::{Error, Result};
use crate::domain::{
    elapsed_ms, year_end, DataFrequency, DataPoint, DataQuality, DataRequest, DataResponse,
    TimeSeries,
};
use crate::ports::{DataSource, SourceType};

use self::codes::{CountryInfo, IndicatorInfo};

pub const WORLD_BANK_SOURCE_NAME: &str = "world_bank";

/// Records per page requested from the API
const PAGE_SIZE: u32 = 1000;

/// Upper bound on pages walked for a single series
const MAX_PAGES: u32 = 100;

/// Earliest year the API carries; used when a range has only an end
const FIRST_YEAR: i32 = 1960;

const PROBE_COUNTRY: &str = "USA";
const PROBE_INDICATOR: &str = "NY.GDP.MKTP.CD";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// API Response Models
// =============================================================================

/// First element of every page: `{page, pages, per_page, total}`
#[derive(Debug, Clone, Deserialize)]
struct PageMeta {
    #[serde(deserialize_with = "deserialize_count")]
    page: u32,
    #[serde(deserialize_with = "deserialize_count")]
    pages: u32,
}

/// `{id, value}` reference used for both country and indicator
#[derive(Debug, Clone, Deserialize)]
struct Reference {
    #[serde(default)]
    id: String,
    #[serde(default)]
    value: String,
}

/// Second element of a page: one observation
#[derive(Debug, Clone, Deserialize)]
struct WorldBankRecord {
    indicator: Reference,
    country: Reference,
    #[serde(default)]
    countryiso3code: Option<String>,
    date: String,
    value: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
}

/// Deserialize a count that can be number or string (the API returns both)
fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| D::Error::custom(format!("invalid count: {}", n))),
        JsonValue::String(s) => s
            .trim()
            .parse()
            .map_err(|e| D::Error::custom(format!("invalid count '{}': {}", s, e))),
        _ => Err(D::Error::custom("expected number or string for count")),
    }
}

/// One decoded page
struct Page {
    meta: PageMeta,
    records: Vec<JsonValue>,
}

/// Split a raw payload into metadata and records
///
/// The API reports errors as `[{"message": [{"id", "key", "value"}]}]` with a
/// 200 status, and reports "no data" as `[meta, null]`.
fn parse_page(body: &str) -> Result<Page> {
    let payload: Vec<JsonValue> = serde_json::from_str(body)
        .map_err(|e| Error::MalformedRecord(format!("Unexpected World Bank payload: {}", e)))?;

    let first = payload
        .first()
        .ok_or_else(|| Error::not_found("Empty World Bank payload"))?;

    if let Some(messages) = first.get("message") {
        let text = messages
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|m| m.get("value").and_then(|v| v.as_str()))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default();
        return Err(Error::not_found(format!("World Bank API error: {}", text)));
    }

    let meta: PageMeta = serde_json::from_value(first.clone())
        .map_err(|e| Error::MalformedRecord(format!("Bad page metadata: {}", e)))?;

    match payload.get(1) {
        Some(JsonValue::Array(records)) => Ok(Page {
            meta,
            records: records.clone(),
        }),
        _ => Err(Error::not_found("World Bank API returned no records")),
    }
}

// =============================================================================
// World Bank HTTP Client
// =============================================================================

/// Provider backed by the World Bank Indicators API
#[derive(Debug)]
pub struct WorldBankDataSource {
    client: Client,
    base_url: String,
    enabled: bool,
    max_retries: u32,
    retry_delay: Duration,
}

impl WorldBankDataSource {
    pub fn new(config: &WorldBankConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        info!(
            base_url = %config.base_url,
            enabled = config.enabled,
            max_retries = config.max_retries,
            "World Bank source initialized"
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            enabled: config.enabled,
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resolve(&self, request: &DataRequest) -> Result<(&'static CountryInfo, &'static IndicatorInfo)> {
        let country = codes::country_info(&request.country).ok_or_else(|| {
            Error::invalid_request(format!("Unknown country code '{}'", request.country))
        })?;
        let indicator = codes::indicator(&request.indicator).ok_or_else(|| {
            Error::invalid_request(format!("Unknown indicator '{}'", request.indicator))
        })?;
        Ok((country, indicator))
    }

    fn series_url(
        &self,
        country_code: &str,
        indicator_code: &str,
        date: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Url> {
        let raw = format!(
            "{}/country/{}/indicator/{}",
            self.base_url, country_code, indicator_code
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| Error::invalid_request(format!("Invalid URL '{}': {}", raw, e)))?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("format", "json")
                .append_pair("per_page", &per_page.to_string());
            if let Some(date) = date {
                query.append_pair("date", date);
            }
            if page > 1 {
                query.append_pair("page", &page.to_string());
            }
        }

        Ok(url)
    }

    /// GET with the retry policy, counting every HTTP attempt into `attempts`
    fn get_with_retry(&self, url: &Url, attempts: &mut u32) -> Result<String> {
        let mut last_error = String::new();
        let mut rate_limited = false;

        for attempt in 1..=self.max_retries {
            *attempts += 1;
            let is_last = attempt == self.max_retries;

            match self.client.get(url.clone()).send() {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    rate_limited = true;
                    last_error = "HTTP 429 Too Many Requests".to_string();
                    warn!(attempt, max = self.max_retries, "Rate limited by World Bank API");
                    if !is_last {
                        thread::sleep(self.retry_delay * attempt);
                    }
                }
                Ok(response) if !response.status().is_success() => {
                    rate_limited = false;
                    last_error = format!("HTTP {}", response.status());
                    warn!(attempt, status = %response.status(), "World Bank request failed");
                    if !is_last {
                        thread::sleep(self.retry_delay);
                    }
                }
                Ok(response) => match response.text() {
                    Ok(body) => return Ok(body),
                    Err(e) => {
                        rate_limited = false;
                        last_error = format!("Failed to read response body: {}", e);
                        warn!(attempt, error = %e, "World Bank response body unreadable");
                        if !is_last {
                            thread::sleep(self.retry_delay);
                        }
                    }
                },
                Err(e) => {
                    rate_limited = false;
                    last_error = describe_request_error(&e);
                    warn!(attempt, error = %last_error, "World Bank request failed");
                    if !is_last {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        let message = format!(
            "World Bank request failed after {} attempts: {}",
            self.max_retries, last_error
        );
        if rate_limited {
            Err(Error::RateLimited(message))
        } else {
            Err(Error::transport(message))
        }
    }

    fn fetch(&self, request: &DataRequest, attempts: &mut u32) -> Result<TimeSeries> {
        if !self.enabled {
            return Err(Error::unavailable("World Bank source is disabled"));
        }

        let (country, indicator) = self.resolve(request)?;
        let date = date_param(request);

        let mut series = TimeSeries::new(&request.country, &request.indicator, WORLD_BANK_SOURCE_NAME)
            .with_category(Some(indicator.category));
        series
            .metadata
            .insert("indicator_code".to_string(), indicator.code.into());
        series
            .metadata
            .insert("country_code".to_string(), country.iso3.into());

        let mut page = 1;
        loop {
            let url = self.series_url(country.iso3, indicator.code, date.as_deref(), page, PAGE_SIZE)?;
            debug!(url = %url, page, "Fetching World Bank page");

            let body = self.get_with_retry(&url, attempts)?;
            let decoded = parse_page(&body)?;

            if decoded.meta.page != page {
                return Err(Error::MalformedRecord(format!(
                    "World Bank returned page {} when page {} was requested",
                    decoded.meta.page, page
                )));
            }

            for record in decoded.records {
                if let Some(point) = parse_record(record, request) {
                    series.push(point)?;
                }
            }

            let last_page = decoded.meta.pages.min(MAX_PAGES);
            if decoded.meta.pages > MAX_PAGES && page == MAX_PAGES {
                warn!(pages = decoded.meta.pages, "World Bank series truncated at page limit");
            }
            page += 1;
            if page > last_page {
                break;
            }
        }

        debug!(
            country = country.iso3,
            indicator = indicator.code,
            points = series.len(),
            "World Bank fetch complete"
        );
        Ok(series)
    }
}

impl DataSource for WorldBankDataSource {
    fn name(&self) -> &str {
        WORLD_BANK_SOURCE_NAME
    }

    fn source_type(&self) -> SourceType {
        SourceType::Api
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn supported_indicators(&self) -> Vec<String> {
        codes::INDICATORS.iter().map(|i| i.name.to_string()).collect()
    }

    fn supported_countries(&self) -> Vec<String> {
        codes::COUNTRIES
            .iter()
            .map(|c| c.iso3.to_lowercase())
            .collect()
    }

    fn validate_request(&self, request: &DataRequest) -> bool {
        self.enabled && self.resolve(request).is_ok()
    }

    fn fetch_data(&self, request: &DataRequest) -> DataResponse {
        let started = Instant::now();
        let mut attempts = 0;
        let result = self.fetch(request, &mut attempts);

        if let Err(e) = &result {
            warn!(
                country = %request.country,
                indicator = %request.indicator,
                error = %e,
                "World Bank fetch failed"
            );
        }

        DataResponse::from_result(result, WORLD_BANK_SOURCE_NAME, started)
            .with_metadata("attempts", attempts)
    }

    fn is_available(&self) -> bool {
        if !self.enabled {
            return false;
        }

        let url = match self.series_url(PROBE_COUNTRY, PROBE_INDICATOR, None, 1, 1) {
            Ok(url) => url,
            Err(_) => return false,
        };

        match self.client.get(url).timeout(PROBE_TIMEOUT).send() {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!(error = %e, "World Bank availability probe failed");
                false
            }
        }
    }

    fn get_data_frequency(&self, indicator: &str) -> DataFrequency {
        codes::indicator(indicator)
            .map(|i| i.frequency)
            .unwrap_or(DataFrequency::Annual)
    }

    fn supports_indicator(&self, indicator: &str) -> bool {
        codes::indicator(indicator).is_some()
    }
}

/// `date=start:end` in years, or None when the request has no range
fn date_param(request: &DataRequest) -> Option<String> {
    match (request.start_date, request.end_date) {
        (None, None) => None,
        (Some(start), end) => Some(format!(
            "{}:{}",
            start.year(),
            end.map(|d| d.year()).unwrap_or_else(|| Utc::now().year())
        )),
        (None, Some(end)) => Some(format!("{}:{}", FIRST_YEAR, end.year())),
    }
}

/// Convert one raw record, or None when it should be skipped
fn parse_record(raw: JsonValue, request: &DataRequest) -> Option<DataPoint> {
    let record: WorldBankRecord = match serde_json::from_value(raw) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "Skipping malformed World Bank record");
            return None;
        }
    };

    let value = record.value?;

    let timestamp = match record.date.trim().parse::<i32>().ok().and_then(year_end) {
        Some(ts) => ts,
        None => {
            warn!(date = %record.date, "Skipping World Bank record with unparseable year");
            return None;
        }
    };

    let country_id = record
        .countryiso3code
        .filter(|c| !c.is_empty())
        .unwrap_or(record.country.id);

    Some(
        DataPoint::new(
            value,
            timestamp,
            &request.country,
            &request.indicator,
            WORLD_BANK_SOURCE_NAME,
        )
        .with_quality(DataQuality::Official)
        .with_unit(record.unit)
        .with_metadata("country_id", country_id)
        .with_metadata("country_name", record.country.value)
        .with_metadata("indicator_id", record.indicator.id)
        .with_metadata("indicator_name", record.indicator.value),
    )
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn source() -> WorldBankDataSource {
        WorldBankDataSource::new(&WorldBankConfig::default()).unwrap()
    }

    #[test]
    fn test_date_param() {
        let none = DataRequest::new("usa", "gdp");
        assert_eq!(date_param(&none), None);

        let both = DataRequest::new("usa", "gdp").with_range(
            NaiveDate::from_ymd_opt(2010, 1, 1),
            NaiveDate::from_ymd_opt(2020, 6, 30),
        );
        assert_eq!(date_param(&both).as_deref(), Some("2010:2020"));

        let open_end = DataRequest::new("usa", "gdp").with_range(NaiveDate::from_ymd_opt(2015, 1, 1), None);
        assert_eq!(
            date_param(&open_end),
            Some(format!("2015:{}", Utc::now().year()))
        );

        let open_start = DataRequest::new("usa", "gdp").with_range(None, NaiveDate::from_ymd_opt(2000, 1, 1));
        assert_eq!(date_param(&open_start).as_deref(), Some("1960:2000"));
    }

    #[test]
    fn test_series_url() {
        let source = source();
        let url = source
            .series_url("USA", "NY.GDP.MKTP.CD", Some("2010:2020"), 2, PAGE_SIZE)
            .unwrap();

        assert_eq!(url.path(), "/v2/country/USA/indicator/NY.GDP.MKTP.CD");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("format".to_string(), "json".to_string())));
        assert!(query.contains(&("per_page".to_string(), "1000".to_string())));
        assert!(query.contains(&("date".to_string(), "2010:2020".to_string())));
        assert!(query.contains(&("page".to_string(), "2".to_string())));
    }

    #[test]
    fn test_validate_request() {
        let source = source();
        assert!(source.validate_request(&DataRequest::new("usa", "gdp")));
        assert!(source.validate_request(&DataRequest::new("DE", "SP.POP.TOTL")));
        assert!(!source.validate_request(&DataRequest::new("atlantis", "gdp")));
        assert!(!source.validate_request(&DataRequest::new("usa", "happiness")));
    }

    #[test]
    fn test_unknown_codes_fail_without_network() {
        let response = source().fetch_data(&DataRequest::new("atlantis", "gdp"));
        assert!(!response.is_success());
        assert!(response.error().unwrap().contains("Unknown country"));
        assert_eq!(response.metadata["attempts"], 0);
    }

    #[test]
    fn test_disabled_source() {
        let config = WorldBankConfig {
            enabled: false,
            ..WorldBankConfig::default()
        };
        let source = WorldBankDataSource::new(&config).unwrap();
        assert!(!source.is_available());
        assert!(!source.validate_request(&DataRequest::new("usa", "gdp")));

        let response = source.fetch_data(&DataRequest::new("usa", "gdp"));
        assert!(response.error().unwrap().contains("disabled"));
    }

    #[test]
    fn test_parse_page_error_payload() {
        let body = r#"[{"message":[{"id":"120","key":"Invalid value","value":"The provided parameter value is not valid"}]}]"#;
        match parse_page(body) {
            Err(Error::NotFound(msg)) => assert!(msg.contains("not valid")),
            other => panic!("expected NotFound, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_parse_page_null_records() {
        let body = r#"[{"page":1,"pages":0,"per_page":"1000","total":0},null]"#;
        assert!(matches!(parse_page(body), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_parse_record() {
        let request = DataRequest::new("usa", "gdp");
        let raw = serde_json::json!({
            "indicator": {"id": "NY.GDP.MKTP.CD", "value": "GDP (current US$)"},
            "country": {"id": "US", "value": "United States"},
            "countryiso3code": "USA",
            "date": "2020",
            "value": 20.9e12,
            "unit": "",
            "obs_status": "",
            "decimal": 0
        });

        let point = parse_record(raw, &request).unwrap();
        assert_eq!(point.quality(), DataQuality::Official);
        assert_eq!(point.unit(), None);
        assert_eq!(point.timestamp(), year_end(2020).unwrap());
        assert_eq!(point.metadata()["country_id"], "USA");
        assert_eq!(point.metadata()["indicator_name"], "GDP (current US$)");

        let null_value = serde_json::json!({
            "indicator": {"id": "x", "value": "x"},
            "country": {"id": "US", "value": "United States"},
            "date": "2021",
            "value": null
        });
        assert!(parse_record(null_value, &request).is_none());

        let bad_year = serde_json::json!({
            "indicator": {"id": "x", "value": "x"},
            "country": {"id": "US", "value": "United States"},
            "date": "2021Q1",
            "value": 1.0
        });
        assert!(parse_record(bad_year, &request).is_none());
    }

    #[test]
    fn test_frequency_and_support() {
        let source = source();
        assert_eq!(source.get_data_frequency("gdp"), DataFrequency::Annual);
        assert!(source.supports_indicator("NY.GDP.MKTP.CD"));
        assert!(source.supports_indicator("population"));
        assert!(!source.supports_indicator("happiness"));
        assert!(source.supported_countries().contains(&"usa".to_string()));
    }
}
