// src/config/app.rs
use super::defaults::*;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::aliases::StoreKey;
use crate::cache::CacheOptions;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub cache: CacheSettings,
    pub pipeline: PipelineSettings,
}

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// Directory holding the `young` and `old` generations
    pub dir: PathBuf,
    /// Rotate at close once young's store is larger than this many bytes
    pub young_size_limit: u64,
    /// SQLCipher passphrase; stores are left unkeyed when absent
    pub store_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    pub workers: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        default_cache()
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        default_pipeline()
    }
}

// Never print the store key
impl fmt::Debug for CacheSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSettings")
            .field("dir", &self.dir)
            .field("young_size_limit", &self.young_size_limit)
            .field("store_key", &self.store_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl CacheSettings {
    pub fn options(&self) -> CacheOptions {
        CacheOptions {
            young_size_limit: self.young_size_limit,
            store_key: self.store_key.clone().map(StoreKey::new),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply `CRYPT_MEMO_*` environment overrides on top of the file values
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
            self.cache.dir = PathBuf::from(dir);
        }
        if let Ok(key) = std::env::var(STORE_KEY_ENV) {
            self.cache.store_key = Some(key);
        }
        if let Ok(workers) = std::env::var(WORKERS_ENV) {
            self.pipeline.workers = workers.trim().parse().map_err(|_| {
                CoreError::Config(format!("{WORKERS_ENV}={workers:?} is not a count"))
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            return Err(CoreError::Config(
                "pipeline.workers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load config at runtime — falls back to defaults if missing or invalid
pub fn load() -> &'static Config {
    CONFIG.get_or_init(|| {
        let config_path =
            std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut conf = if Path::new(&config_path).exists() {
            Config::from_file(&config_path).unwrap_or_else(|e| {
                tracing::warn!("ignoring {config_path}: {e}; using built-in defaults");
                Config::default()
            })
        } else {
            tracing::debug!("{config_path} not found — using built-in defaults");
            Config::default()
        };

        if let Err(e) = conf.apply_env() {
            tracing::warn!("ignoring worker override: {e}");
            conf.pipeline = default_pipeline();
        }

        conf
    })
}
