//! Configuration management
//!
//! Settings live in `settings.json` inside the gauge home directory:
//! ```json
//! {
//!   "cache": { "enabled": true, "strategy": "hybrid", "defaultTtlSecs": 86400 },
//!   "data": { "dir": "data" },
//!   "providers": {
//!     "file": { "enabled": true },
//!     "worldBank": { "enabled": true, "timeoutSecs": 30, "maxRetries": 3 }
//!   }
//! }
//! ```
//! Every field is optional. Relative paths are resolved against the home
//! directory. Hosts that already hold a flat key-value configuration can use
//! [`Config::from_flat_map`] instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::result::Error as DomainError;
use crate::services::cache::CacheStrategy;

/// Environment variable overriding the gauge home directory
pub const GAUGE_HOME_ENV: &str = "GAUGE_HOME";

const DEFAULT_TTL_SECS: u64 = 86_400;
const DEFAULT_MAX_MEMORY_ENTRIES: usize = 1_000;
const DEFAULT_WORLD_BANK_URL: &str = "https://api.worldbank.org/v2";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    cache: CacheSettings,
    #[serde(default)]
    data: DataSettings,
    #[serde(default)]
    providers: ProviderSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheSettings {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default)]
    dir: Option<PathBuf>,
    #[serde(default)]
    default_ttl_secs: Option<u64>,
    #[serde(default)]
    max_memory_entries: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataSettings {
    #[serde(default)]
    dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderSettings {
    #[serde(default)]
    file: FileSettings,
    #[serde(default)]
    world_bank: WorldBankSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileSettings {
    #[serde(default)]
    enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorldBankSettings {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    max_retries: Option<u32>,
    #[serde(default)]
    retry_delay_ms: Option<u64>,
}

/// Cache manager settings
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub strategy: CacheStrategy,
    pub dir: PathBuf,
    pub default_ttl: Duration,
    pub max_memory_entries: usize,
}

/// File provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct FileSourceConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

/// World Bank provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct WorldBankConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for WorldBankConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_WORLD_BANK_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// Gauge configuration (resolved view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub home: PathBuf,
    pub cache: CacheConfig,
    pub file_source: FileSourceConfig,
    pub world_bank: WorldBankConfig,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Defaults rooted at `home`
    pub fn with_home(home: &Path) -> Self {
        Self::resolve(home, SettingsFile::default())
    }

    /// Default home directory: `$GAUGE_HOME`, else `~/.gauge`
    pub fn default_home() -> PathBuf {
        if let Ok(home) = std::env::var(GAUGE_HOME_ENV) {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gauge")
    }

    /// Load config from the gauge home directory
    ///
    /// Environment overrides (applied after the file):
    /// `GAUGE_CACHE_STRATEGY`, `GAUGE_CACHE_DIR`, `GAUGE_CACHE_DISABLED`,
    /// `GAUGE_DATA_DIR`, `GAUGE_WORLD_BANK_URL`.
    pub fn load(home: &Path) -> Result<Self> {
        let settings_path = home.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let mut config = Self::resolve(home, raw);
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Save config to the gauge home directory
    /// Preserves other settings that gauge doesn't manage
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.home)?;
        let settings_path = self.home.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            self._raw_settings.clone()
        };

        settings.cache = CacheSettings {
            enabled: Some(self.cache.enabled),
            strategy: Some(self.cache.strategy.as_str().to_string()),
            dir: Some(self.cache.dir.clone()),
            default_ttl_secs: Some(self.cache.default_ttl.as_secs()),
            max_memory_entries: Some(self.cache.max_memory_entries),
        };
        settings.data.dir = Some(self.file_source.dir.clone());
        settings.providers.file.enabled = Some(self.file_source.enabled);
        settings.providers.world_bank = WorldBankSettings {
            enabled: Some(self.world_bank.enabled),
            base_url: Some(self.world_bank.base_url.clone()),
            timeout_secs: Some(self.world_bank.timeout.as_secs()),
            max_retries: Some(self.world_bank.max_retries),
            retry_delay_ms: Some(self.world_bank.retry_delay.as_millis() as u64),
        };

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Build a config from a flat key-value object
    ///
    /// Recognised keys: `cache.enabled`, `cache.strategy`, `cache.dir`,
    /// `cache.default_ttl_secs`, `cache.max_memory_entries`, `data.dir`,
    /// `file.enabled`, `world_bank.enabled`, `world_bank.base_url`,
    /// `world_bank.timeout_secs`, `world_bank.max_retries`,
    /// `world_bank.retry_delay_ms`. Unknown keys are ignored.
    pub fn from_flat_map(
        home: &Path,
        values: &HashMap<String, String>,
    ) -> std::result::Result<Self, DomainError> {
        let mut config = Self::with_home(home);

        for (key, value) in values {
            let value = value.trim();
            match key.as_str() {
                "cache.enabled" => config.cache.enabled = parse_bool(key, value)?,
                "cache.strategy" => config.cache.strategy = value.parse()?,
                "cache.dir" => config.cache.dir = resolve_path(home, Path::new(value)),
                "cache.default_ttl_secs" => {
                    config.cache.default_ttl = Duration::from_secs(parse_num(key, value)?)
                }
                "cache.max_memory_entries" => {
                    config.cache.max_memory_entries = parse_num(key, value)?
                }
                "data.dir" => config.file_source.dir = resolve_path(home, Path::new(value)),
                "file.enabled" => config.file_source.enabled = parse_bool(key, value)?,
                "world_bank.enabled" => config.world_bank.enabled = parse_bool(key, value)?,
                "world_bank.base_url" => config.world_bank.base_url = value.to_string(),
                "world_bank.timeout_secs" => {
                    config.world_bank.timeout = Duration::from_secs(parse_num(key, value)?)
                }
                "world_bank.max_retries" => {
                    config.world_bank.max_retries = parse_num(key, value)?
                }
                "world_bank.retry_delay_ms" => {
                    config.world_bank.retry_delay = Duration::from_millis(parse_num(key, value)?)
                }
                _ => {}
            }
        }

        if config.world_bank.max_retries == 0 {
            return Err(DomainError::Config(
                "world_bank.max_retries must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    fn resolve(home: &Path, raw: SettingsFile) -> Self {
        let cache_dir = raw
            .cache
            .dir
            .as_deref()
            .map(|d| resolve_path(home, d))
            .unwrap_or_else(|| home.join("cache"));
        let data_dir = raw
            .data
            .dir
            .as_deref()
            .map(|d| resolve_path(home, d))
            .unwrap_or_else(|| home.join("data"));

        // An unrecognised strategy name falls back to the default rather
        // than refusing to start
        let strategy = raw
            .cache
            .strategy
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let wb = &raw.providers.world_bank;
        let world_bank = WorldBankConfig {
            enabled: wb.enabled.unwrap_or(true),
            base_url: wb
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_WORLD_BANK_URL.to_string()),
            timeout: Duration::from_secs(wb.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            max_retries: wb.max_retries.unwrap_or(DEFAULT_MAX_RETRIES).max(1),
            retry_delay: Duration::from_millis(wb.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS)),
        };

        Self {
            home: home.to_path_buf(),
            cache: CacheConfig {
                enabled: raw.cache.enabled.unwrap_or(true),
                strategy,
                dir: cache_dir,
                default_ttl: Duration::from_secs(
                    raw.cache.default_ttl_secs.unwrap_or(DEFAULT_TTL_SECS),
                ),
                max_memory_entries: raw
                    .cache
                    .max_memory_entries
                    .unwrap_or(DEFAULT_MAX_MEMORY_ENTRIES),
            },
            file_source: FileSourceConfig {
                enabled: raw.providers.file.enabled.unwrap_or(true),
                dir: data_dir,
            },
            world_bank,
            _raw_settings: raw,
        }
    }

    fn apply_env_overrides(&mut self) -> std::result::Result<(), DomainError> {
        if let Ok(strategy) = std::env::var("GAUGE_CACHE_STRATEGY") {
            self.cache.strategy = strategy.parse()?;
        }
        if let Ok(dir) = std::env::var("GAUGE_CACHE_DIR") {
            self.cache.dir = resolve_path(&self.home, Path::new(&dir));
        }
        if let Ok(dir) = std::env::var("GAUGE_DATA_DIR") {
            self.file_source.dir = resolve_path(&self.home, Path::new(&dir));
        }
        match std::env::var("GAUGE_CACHE_DISABLED").ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => self.cache.enabled = false,
            Some("false" | "0" | "no" | "FALSE" | "NO") => self.cache.enabled = true,
            _ => {}
        }
        if let Ok(url) = std::env::var("GAUGE_WORLD_BANK_URL") {
            self.world_bank.base_url = url;
        }
        Ok(())
    }
}

fn resolve_path(home: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}

fn parse_bool(key: &str, value: &str) -> std::result::Result<bool, DomainError> {
    match value {
        "true" | "1" | "yes" | "TRUE" | "YES" => Ok(true),
        "false" | "0" | "no" | "FALSE" | "NO" => Ok(false),
        _ => Err(DomainError::Config(format!(
            "{} expects a boolean, got '{}'",
            key, value
        ))),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> std::result::Result<T, DomainError> {
    value
        .parse()
        .map_err(|_| DomainError::Config(format!("{} expects a number, got '{}'", key, value)))
}
