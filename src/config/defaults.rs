// src/config/defaults.rs
use std::path::PathBuf;

use crate::config::app::{CacheSettings, PipelineSettings};
use crate::consts::{DEFAULT_CACHE_DIR, DEFAULT_WORKERS, DEFAULT_YOUNG_SIZE_LIMIT};

pub const CONFIG_ENV: &str = "CRYPT_MEMO_CONFIG";
pub const CACHE_DIR_ENV: &str = "CRYPT_MEMO_CACHE_DIR";
pub const STORE_KEY_ENV: &str = "CRYPT_MEMO_STORE_KEY";
pub const WORKERS_ENV: &str = "CRYPT_MEMO_WORKERS";

pub const DEFAULT_CONFIG_PATH: &str = "crypt-memo.toml";

pub fn default_cache() -> CacheSettings {
    CacheSettings {
        dir: PathBuf::from(DEFAULT_CACHE_DIR),
        young_size_limit: DEFAULT_YOUNG_SIZE_LIMIT,
        store_key: None,
    }
}

pub fn default_pipeline() -> PipelineSettings {
    PipelineSettings {
        workers: default_workers(),
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(DEFAULT_WORKERS)
}
