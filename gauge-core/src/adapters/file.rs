//! Local file data provider
//!
//! Serves indicator tables stored as `.csv`, `.xlsx` or `.xls` files in a
//! data directory. File names follow `{indicator}_{country}.ext`; the
//! country is the part after the last underscore. A name without an
//! underscore is an indicator-only dataset for country `global`.
//!
//! Each table needs `date` and `value` columns and may carry `quality` and
//! `unit`. Tables are loaded on first use and kept in memory for the
//! lifetime of the provider; later edits to a file are not picked up.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::config::FileSourceConfig;
use crate::domain::result::{Error, Result};
use crate::domain::{
    elapsed_ms, in_range, year_end, DataFrequency, DataPoint, DataQuality, DataRequest,
    DataResponse, TimeSeries,
};
use crate::ports::{DataSource, SourceType};

pub const FILE_SOURCE_NAME: &str = "file";

const GLOBAL_COUNTRY: &str = "global";
const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// A cell as read from a dataset, before interpretation
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    DateTime(NaiveDateTime),
}

/// A loaded dataset
#[derive(Debug)]
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
    /// Rows the reader itself could not decode
    unreadable_rows: usize,
}

/// Positions of the known columns in a table
struct Columns {
    date: usize,
    value: usize,
    quality: Option<usize>,
    unit: Option<usize>,
}

impl Columns {
    fn locate(headers: &[String]) -> std::result::Result<Self, Vec<&'static str>> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        match (find("date"), find("value")) {
            (Some(date), Some(value)) => Ok(Self {
                date,
                value,
                quality: find("quality"),
                unit: find("unit"),
            }),
            (date, value) => {
                let mut missing = Vec::new();
                if date.is_none() {
                    missing.push("date");
                }
                if value.is_none() {
                    missing.push("value");
                }
                Err(missing)
            }
        }
    }
}

/// Provider for datasets stored in a local directory
pub struct FileDataSource {
    name: String,
    data_dir: PathBuf,
    enabled: bool,
    /// `{indicator}_{country}` -> file
    datasets: BTreeMap<String, PathBuf>,
    frequencies: HashMap<String, DataFrequency>,
    tables: Mutex<HashMap<PathBuf, Arc<Table>>>,
}

impl FileDataSource {
    /// Scan `data_dir` once and index every supported file
    ///
    /// A missing directory gives an empty, disabled provider.
    pub fn new(data_dir: &Path, enabled: bool) -> Self {
        let dir_exists = data_dir.is_dir();
        if enabled && !dir_exists {
            warn!(dir = %data_dir.display(), "Data directory not found, file source disabled");
        }

        let datasets = if enabled && dir_exists {
            scan_datasets(data_dir)
        } else {
            BTreeMap::new()
        };

        info!(
            dir = %data_dir.display(),
            datasets = datasets.len(),
            "File source initialized"
        );

        Self {
            name: FILE_SOURCE_NAME.to_string(),
            data_dir: data_dir.to_path_buf(),
            enabled: enabled && dir_exists,
            datasets,
            frequencies: HashMap::new(),
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &FileSourceConfig) -> Self {
        Self::new(&config.dir, config.enabled)
    }

    /// Declare the update cadence of an indicator (default: annual)
    pub fn with_frequency(mut self, indicator: &str, frequency: DataFrequency) -> Self {
        self.frequencies.insert(indicator.to_lowercase(), frequency);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Indexed dataset keys (`{indicator}_{country}`)
    pub fn dataset_keys(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }

    fn fetch(&self, request: &DataRequest) -> Result<(TimeSeries, usize, PathBuf)> {
        if !self.enabled {
            return Err(Error::unavailable(format!(
                "File source is disabled (data directory: {})",
                self.data_dir.display()
            )));
        }

        let key = dataset_key(&request.indicator, &request.country);
        let path = self.datasets.get(&key).ok_or_else(|| {
            Error::not_found(format!(
                "No dataset for indicator '{}' and country '{}'",
                request.indicator, request.country
            ))
        })?;

        let table = self.load_table(path)?;
        let columns = Columns::locate(&table.headers).map_err(|missing| {
            Error::validation(format!(
                "Dataset {} is missing required column(s): {}",
                path.display(),
                missing.join(", ")
            ))
        })?;

        let mut series = TimeSeries::new(&request.country, &request.indicator, &self.name);
        series
            .metadata
            .insert("file".to_string(), path.display().to_string().into());

        let mut skipped = table.unreadable_rows;
        for (index, row) in table.rows.iter().enumerate() {
            match parse_row(row, &columns, request, &self.name) {
                Ok(point) => {
                    if in_range(point.timestamp(), request.start_date, request.end_date) {
                        series.push(point)?;
                    }
                }
                Err(e) => {
                    debug!(file = %path.display(), row = index + 1, error = %e, "Skipping row");
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!(file = %path.display(), skipped, "Skipped malformed rows");
        }

        Ok((series, skipped, path.clone()))
    }

    fn load_table(&self, path: &Path) -> Result<Arc<Table>> {
        if let Some(table) = self.lock_tables()?.get(path) {
            return Ok(Arc::clone(table));
        }

        // Read without the lock so cold loads of different files overlap
        let table = Arc::new(read_table(path)?);
        debug!(file = %path.display(), rows = table.rows.len(), "Loaded dataset");

        let mut tables = self.lock_tables()?;
        let cached = tables.entry(path.to_path_buf()).or_insert(table);
        Ok(Arc::clone(cached))
    }

    fn lock_tables(&self) -> Result<MutexGuard<'_, HashMap<PathBuf, Arc<Table>>>> {
        self.tables
            .lock()
            .map_err(|e| Error::Other(format!("Table cache lock poisoned: {}", e)))
    }

    fn known(&self) -> (BTreeSet<String>, BTreeSet<String>) {
        let mut indicators = BTreeSet::new();
        let mut countries = BTreeSet::new();
        for key in self.datasets.keys() {
            if let Some((indicator, country)) = split_key(key) {
                indicators.insert(indicator.to_string());
                countries.insert(country.to_string());
            }
        }
        (indicators, countries)
    }
}

impl DataSource for FileDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_type(&self) -> SourceType {
        SourceType::File
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn supported_indicators(&self) -> Vec<String> {
        self.known().0.into_iter().collect()
    }

    fn supported_countries(&self) -> Vec<String> {
        self.known().1.into_iter().collect()
    }

    fn validate_request(&self, request: &DataRequest) -> bool {
        if !self.enabled {
            return false;
        }
        let (indicators, countries) = self.known();
        indicators.contains(&request.indicator.to_lowercase())
            && countries.contains(&request.country.to_lowercase())
    }

    fn fetch_data(&self, request: &DataRequest) -> DataResponse {
        let started = Instant::now();
        match self.fetch(request) {
            Ok((series, skipped, path)) => {
                DataResponse::ok(series, &self.name, elapsed_ms(started))
                    .with_metadata("file", path.display().to_string())
                    .with_metadata("rows_skipped", skipped)
            }
            Err(e) => {
                debug!(
                    country = %request.country,
                    indicator = %request.indicator,
                    error = %e,
                    "File fetch failed"
                );
                DataResponse::fail(e.to_string(), &self.name, elapsed_ms(started))
            }
        }
    }

    fn is_available(&self) -> bool {
        self.enabled && self.data_dir.is_dir()
    }

    fn get_data_frequency(&self, indicator: &str) -> DataFrequency {
        self.frequencies
            .get(&indicator.to_lowercase())
            .copied()
            .unwrap_or(DataFrequency::Annual)
    }
}

// =============================================================================
// Directory scan
// =============================================================================

fn scan_datasets(dir: &Path) -> BTreeMap<String, PathBuf> {
    let mut datasets = BTreeMap::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to scan data directory");
            return datasets;
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_supported_extension(path))
        .collect();
    paths.sort();

    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let (indicator, country) = key_from_stem(stem);
        let key = dataset_key(&indicator, &country);

        if let Some(existing) = datasets.get(&key) {
            warn!(
                key = %key,
                kept = %existing.display(),
                ignored = %path.display(),
                "Duplicate dataset"
            );
            continue;
        }
        datasets.insert(key, path);
    }

    datasets
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Split a file stem into (indicator, country) on the last underscore
fn key_from_stem(stem: &str) -> (String, String) {
    let stem = stem.to_lowercase();
    match stem.rsplit_once('_') {
        Some((indicator, country)) if !indicator.is_empty() && !country.is_empty() => {
            (indicator.to_string(), country.to_string())
        }
        _ => (stem, GLOBAL_COUNTRY.to_string()),
    }
}

fn dataset_key(indicator: &str, country: &str) -> String {
    format!("{}_{}", indicator.to_lowercase(), country.to_lowercase())
}

fn split_key(key: &str) -> Option<(&str, &str)> {
    key.rsplit_once('_')
}

// =============================================================================
// Table readers
// =============================================================================

fn read_table(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xls" => read_workbook(path),
        other => Err(Error::validation(format!("Unsupported dataset format: {}", other))),
    }
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::Other(format!("Failed to read CSV {}: {}", path.display(), e)))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Other(format!("Failed to read CSV headers {}: {}", path.display(), e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    let mut unreadable_rows = 0;
    for record in reader.records() {
        match record {
            Ok(record) => rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.is_empty() {
                            Cell::Empty
                        } else {
                            Cell::Text(field.to_string())
                        }
                    })
                    .collect(),
            ),
            Err(e) => {
                debug!(file = %path.display(), error = %e, "Unreadable CSV record");
                unreadable_rows += 1;
            }
        }
    }

    Ok(Table {
        headers,
        rows,
        unreadable_rows,
    })
}

/// Read the first worksheet of an `.xlsx` / `.xls` workbook
fn read_workbook(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::Other(format!("Failed to open workbook {}: {}", path.display(), e)))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::validation(format!("Workbook {} has no sheets", path.display())))?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| Error::Other(format!("Failed to read sheet '{}': {}", sheet, e)))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|row| row.iter().map(|c| c.to_string().trim().to_string()).collect())
        .unwrap_or_default();
    let rows = rows
        .map(|row| row.iter().map(cell_from_workbook).collect())
        .collect();

    Ok(Table {
        headers,
        rows,
        unreadable_rows: 0,
    })
}

fn cell_from_workbook(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) => Cell::Text(s.clone()),
        Data::DateTime(dt) => dt.as_datetime().map(Cell::DateTime).unwrap_or(Cell::Empty),
        _ => Cell::Empty,
    }
}

// =============================================================================
// Row parsing
// =============================================================================

fn parse_row(row: &[Cell], columns: &Columns, request: &DataRequest, source: &str) -> Result<DataPoint> {
    let date_cell = row.get(columns.date).unwrap_or(&Cell::Empty);
    let timestamp = parse_timestamp(date_cell)
        .ok_or_else(|| Error::MalformedRecord(format!("unparseable date {:?}", date_cell)))?;

    let value_cell = row.get(columns.value).unwrap_or(&Cell::Empty);
    let value = parse_value(value_cell)
        .ok_or_else(|| Error::MalformedRecord(format!("unparseable value {:?}", value_cell)))?;

    let quality = columns
        .quality
        .and_then(|i| row.get(i))
        .and_then(cell_text)
        .map(|q| q.parse::<DataQuality>().unwrap_or_default())
        .unwrap_or_default();

    let unit = columns.unit.and_then(|i| row.get(i)).and_then(cell_text);

    Ok(
        DataPoint::new(value, timestamp, &request.country, &request.indicator, source)
            .with_quality(quality)
            .with_unit(unit),
    )
}

/// Date policy: ISO-8601 text is an exact timestamp, an integer is a
/// calendar year (normalized to December 31), a native spreadsheet
/// date-time is taken as-is
fn parse_timestamp(cell: &Cell) -> Option<DateTime<Utc>> {
    match cell {
        Cell::Int(year) => i32::try_from(*year).ok().and_then(year_end),
        Cell::Float(f) if f.fract() == 0.0 && f.abs() < i32::MAX as f64 => year_end(*f as i32),
        Cell::DateTime(dt) => Some(Utc.from_utc_datetime(dt)),
        Cell::Text(s) => parse_text_timestamp(s.trim()),
        _ => None,
    }
}

fn parse_text_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(year) = s.parse::<i32>() {
        return year_end(year);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

fn parse_value(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Float(f) => *f,
        Cell::Int(i) => *i as f64,
        Cell::Text(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn cell_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
