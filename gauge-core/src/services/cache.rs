//! Cache service - TTL cache in front of provider fetches
//!
//! Three strategies are supported:
//! - `memory`: process-local map, lost on restart
//! - `disk`: one JSON file per key under the cache directory
//! - `hybrid`: memory first, then disk; disk hits are promoted into memory
//!
//! Caching is strictly best-effort. Any internal failure (I/O, malformed
//! JSON, a poisoned lock) is logged and treated as a miss or a dropped write,
//! so the cache can never fail a caller's fetch.
//!
//! Expiry is checked lazily on access; there is no background sweep.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::domain::result::{Error, Result};
use crate::domain::{DataFrequency, DataResponse, TimeSeries};

/// Advisory lock taken while a cache file is written
const LOCK_FILE: &str = ".gauge-cache.lock";

const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

/// Upper bound for an expiry that would overflow the calendar
const MAX_TTL_DAYS: i64 = 36_500;

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    Memory,
    Disk,
    #[default]
    Hybrid,
}

impl CacheStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStrategy::Memory => "memory",
            CacheStrategy::Disk => "disk",
            CacheStrategy::Hybrid => "hybrid",
        }
    }

    fn uses_memory(&self) -> bool {
        matches!(self, CacheStrategy::Memory | CacheStrategy::Hybrid)
    }

    fn uses_disk(&self) -> bool {
        matches!(self, CacheStrategy::Disk | CacheStrategy::Hybrid)
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(CacheStrategy::Memory),
            "disk" => Ok(CacheStrategy::Disk),
            "hybrid" => Ok(CacheStrategy::Hybrid),
            other => Err(Error::Config(format!(
                "Unknown cache strategy '{}' (expected memory, disk or hybrid)",
                other
            ))),
        }
    }
}

/// In-memory cache entry
#[derive(Debug, Clone)]
struct MemoryEntry {
    response: DataResponse,
    expires_at: DateTime<Utc>,
}

/// On-disk cache file: `{key}.json`
#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    key: String,
    expires_at: DateTime<Utc>,
    response: PersistedResponse,
}

/// Persisted projection of a response
///
/// The series is stored whole (points, point metadata, category), so a
/// disk hit is indistinguishable from the original apart from `cached`.
/// Response-level metadata is not persisted.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedResponse {
    success: bool,
    source: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    fetch_time_ms: f64,
    #[serde(default)]
    data: Option<TimeSeries>,
}

impl PersistedResponse {
    fn from_response(response: &DataResponse) -> Self {
        Self {
            success: response.is_success(),
            source: response.source.clone(),
            error: response.error().map(|e| e.to_string()),
            fetch_time_ms: response.fetch_time_ms,
            data: response.data().cloned(),
        }
    }

    fn into_response(self) -> DataResponse {
        DataResponse::restore(
            self.success,
            self.data,
            self.error,
            self.source,
            self.fetch_time_ms,
        )
    }
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub strategy: CacheStrategy,
    pub dir: PathBuf,
    pub memory_entries: usize,
    pub disk_entries: usize,
}

/// Strategy-driven response cache keyed by (country, indicator, source)
pub struct CacheManager {
    enabled: bool,
    strategy: CacheStrategy,
    cache_dir: PathBuf,
    default_ttl: Duration,
    /// 0 means unbounded
    max_memory_entries: usize,
    memory: Mutex<HashMap<String, MemoryEntry>>,
}

impl CacheManager {
    /// Create a cache manager from configuration
    ///
    /// The cache directory is created up front for disk-backed strategies;
    /// failure to do so is logged and every disk operation will then miss.
    pub fn new(config: &CacheConfig) -> Self {
        if config.enabled && config.strategy.uses_disk() {
            if let Err(e) = fs::create_dir_all(&config.dir) {
                warn!(dir = %config.dir.display(), error = %e, "Failed to create cache directory");
            }
        }

        debug!(
            enabled = config.enabled,
            strategy = %config.strategy,
            dir = %config.dir.display(),
            "Cache manager initialized"
        );

        Self {
            enabled: config.enabled,
            strategy: config.strategy,
            cache_dir: config.dir.clone(),
            default_ttl: config.default_ttl,
            max_memory_entries: config.max_memory_entries,
            memory: Mutex::new(HashMap::new()),
        }
    }

    /// In-memory cache with the default TTL (handy for tests and embedding)
    pub fn in_memory() -> Self {
        Self::new(&CacheConfig {
            enabled: true,
            strategy: CacheStrategy::Memory,
            dir: PathBuf::new(),
            default_ttl: DEFAULT_TTL,
            max_memory_entries: 0,
        })
    }

    /// A cache that never hits and never stores
    pub fn disabled() -> Self {
        Self::new(&CacheConfig {
            enabled: false,
            strategy: CacheStrategy::Memory,
            dir: PathBuf::new(),
            default_ttl: DEFAULT_TTL,
            max_memory_entries: 0,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn strategy(&self) -> CacheStrategy {
        self.strategy
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Deterministic cache key: hex SHA-256 of `country|indicator|source`
    pub fn cache_key(country: &str, indicator: &str, source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}|{}|{}", country, indicator, source).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// TTL resolution: explicit value, else the frequency table, else the default
    pub fn resolve_ttl(&self, ttl: Option<Duration>, frequency: Option<DataFrequency>) -> Duration {
        ttl.or_else(|| frequency.map(|f| f.ttl()))
            .unwrap_or(self.default_ttl)
    }

    /// Look up a cached response
    ///
    /// Returns `None` on a miss, an expired entry, a disabled cache, or any
    /// internal error.
    pub fn get(&self, country: &str, indicator: &str, source: &str) -> Option<DataResponse> {
        if !self.enabled {
            return None;
        }

        let key = Self::cache_key(country, indicator, source);
        match self.try_get(&key) {
            Ok(hit) => {
                debug!(country, indicator, source, hit = hit.is_some(), "Cache lookup");
                hit
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store a response
    ///
    /// No-op when the cache is disabled or the response is a failure. The
    /// response is marked `cached` before it is stored.
    pub fn set(
        &self,
        response: &mut DataResponse,
        country: &str,
        indicator: &str,
        ttl: Option<Duration>,
        frequency: Option<DataFrequency>,
    ) {
        if !self.enabled || !response.is_success() {
            return;
        }

        let ttl = self.resolve_ttl(ttl, frequency);
        let key = Self::cache_key(country, indicator, &response.source);
        let expires_at = expiry_after(Utc::now(), ttl);

        response.mark_cached();

        match self.try_set(&key, response, expires_at) {
            Ok(()) => debug!(
                country,
                indicator,
                source = %response.source,
                ttl_secs = ttl.as_secs(),
                "Cached response"
            ),
            Err(e) => warn!(key = %key, error = %e, "Cache write failed, dropping entry"),
        }
    }

    /// Remove a single entry from every store
    pub fn invalidate(&self, country: &str, indicator: &str, source: &str) {
        let key = Self::cache_key(country, indicator, source);

        match self.lock_memory() {
            Ok(mut memory) => {
                memory.remove(&key);
            }
            Err(e) => warn!(error = %e, "Failed to invalidate memory entry"),
        }

        if self.strategy.uses_disk() {
            remove_if_exists(&self.entry_path(&key));
        }
    }

    /// Empty the memory map and delete every persisted cache file
    ///
    /// A file that cannot be deleted is skipped with a warning; the rest are
    /// still removed. Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let mut removed = 0;

        match self.lock_memory() {
            Ok(mut memory) => {
                removed += memory.len();
                memory.clear();
            }
            Err(e) => warn!(error = %e, "Failed to clear memory cache"),
        }

        for path in self.disk_files() {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to delete cache file")
                }
            }
        }

        info!(removed, "Cache cleared");
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let memory_entries = self.lock_memory().map(|m| m.len()).unwrap_or(0);
        CacheStats {
            enabled: self.enabled,
            strategy: self.strategy,
            dir: self.cache_dir.clone(),
            memory_entries,
            disk_entries: self.disk_files().len(),
        }
    }

    // -- internals --------------------------------------------------------

    fn try_get(&self, key: &str) -> Result<Option<DataResponse>> {
        let now = Utc::now();

        if self.strategy.uses_memory() {
            let mut memory = self.lock_memory()?;
            match memory.get(key) {
                Some(entry) if !is_expired(entry.expires_at, now) => {
                    return Ok(Some(entry.response.clone()));
                }
                Some(_) => {
                    debug!(key, "Memory entry expired");
                    memory.remove(key);
                }
                None => {}
            }
        }

        if self.strategy.uses_disk() {
            if let Some(entry) = self.read_disk(key, now)? {
                let response = entry.response.into_response();
                if self.strategy == CacheStrategy::Hybrid {
                    // Promotion keeps the expiry written to disk
                    self.insert_memory(key, response.clone(), entry.expires_at)?;
                }
                return Ok(Some(response));
            }
        }

        Ok(None)
    }

    fn try_set(&self, key: &str, response: &DataResponse, expires_at: DateTime<Utc>) -> Result<()> {
        if self.strategy.uses_memory() {
            self.insert_memory(key, response.clone(), expires_at)?;
        }

        if self.strategy.uses_disk() {
            let entry = DiskEntry {
                key: key.to_string(),
                expires_at,
                response: PersistedResponse::from_response(response),
            };
            self.write_disk(key, &entry)?;
        }

        Ok(())
    }

    fn insert_memory(&self, key: &str, response: DataResponse, expires_at: DateTime<Utc>) -> Result<()> {
        let mut memory = self.lock_memory()?;

        if self.max_memory_entries > 0
            && memory.len() >= self.max_memory_entries
            && !memory.contains_key(key)
        {
            let now = Utc::now();
            memory.retain(|_, entry| !is_expired(entry.expires_at, now));

            if memory.len() >= self.max_memory_entries {
                let soonest = memory
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(evict) = soonest {
                    debug!(key = %evict, "Evicting memory entry closest to expiry");
                    memory.remove(&evict);
                }
            }
        }

        memory.insert(key.to_string(), MemoryEntry { response, expires_at });
        Ok(())
    }

    fn read_disk(&self, key: &str, now: DateTime<Utc>) -> Result<Option<DiskEntry>> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: DiskEntry = serde_json::from_str(&content)
            .map_err(|e| Error::cache_io(format!("Malformed cache file {}: {}", path.display(), e)))?;

        if is_expired(entry.expires_at, now) {
            debug!(key, "Disk entry expired");
            if let Err(e) = self.remove_expired(key, now) {
                warn!(key, error = %e, "Failed to remove expired cache file");
            }
            return Ok(None);
        }

        Ok(Some(entry))
    }

    /// Delete an entry's file only if it is still expired once the directory
    /// lock is held; a writer may have replaced it since it was read
    fn remove_expired(&self, key: &str, now: DateTime<Utc>) -> Result<()> {
        let lock = self.lock_dir()?;
        let path = self.entry_path(key);

        let still_expired = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<DiskEntry>(&content)
                .map(|entry| is_expired(entry.expires_at, now))
                .unwrap_or(true),
            Err(_) => false,
        };
        if still_expired {
            remove_if_exists(&path);
        }

        let _ = FileExt::unlock(&lock);
        Ok(())
    }

    fn lock_dir(&self) -> Result<File> {
        fs::create_dir_all(&self.cache_dir)?;
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.cache_dir.join(LOCK_FILE))?;
        FileExt::lock_exclusive(&lock)?;
        Ok(lock)
    }

    /// Write through a temp file and rename, under an advisory lock, so a
    /// concurrent reader never sees a partial file
    fn write_disk(&self, key: &str, entry: &DiskEntry) -> Result<()> {
        let lock = self.lock_dir()?;

        let result = (|| -> Result<()> {
            let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
            serde_json::to_writer(&mut tmp, entry)?;
            tmp.persist(self.entry_path(key))
                .map_err(|e| Error::cache_io(format!("Failed to persist cache file: {}", e)))?;
            Ok(())
        })();

        let _ = FileExt::unlock(&lock);
        result
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    fn disk_files(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_cache_file(path))
            .collect()
    }

    fn lock_memory(&self) -> Result<MutexGuard<'_, HashMap<String, MemoryEntry>>> {
        self.memory
            .lock()
            .map_err(|e| Error::cache_io(format!("Cache lock poisoned: {}", e)))
    }
}

/// An entry is expired from the instant its expiry is reached, so a zero
/// TTL is a miss on the very next lookup
fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= expires_at
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or_else(|| now + chrono::Duration::days(MAX_TTL_DAYS))
}

/// Cache files are named `{sha256 hex}.json`; anything else in the
/// directory belongs to someone else
fn is_cache_file(path: &Path) -> bool {
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let stem_is_key = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.len() == 64 && stem.bytes().all(|b| b.is_ascii_hexdigit()));
    is_json && stem_is_key
}

fn remove_if_exists(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(file = %path.display(), error = %e, "Failed to delete cache file");
        }
    }
}
