// src/config/mod.rs
//! Configuration system for crypt-memo
//!
//! Central, lazy-loaded global config with TOML + env overrides.

pub use app::{load, CacheSettings, Config, PipelineSettings};

mod app;
mod defaults;
