// src/lib.rs
//! crypt-memo — memoized value-level encryption
//!
//! Features:
//! - SHA-256 content keys for both lookup directions
//! - Young/old generational cache on SQLite (optionally SQLCipher-keyed)
//! - Worker-pool pipeline that skips values whose output is still current

pub mod aliases;
pub mod cache;
pub mod config;
pub mod consts;
pub mod db;
pub mod error;
pub mod key;
pub mod pipeline;
pub mod provider;

// Re-export everything users need at the crate root
pub use aliases::StoreKey;
pub use cache::{CacheOptions, CloseReport, Generation, TieredCache};
pub use config::load as load_config;
pub use error::{CoreError, ProviderError, Result as CoreResult};
pub use key::{key_for_ciphertext, key_for_plaintext, CacheKey, KeyKind};
pub use pipeline::{BatchReport, CancelToken, DecryptedValue, Pipeline, ValueJob};
pub use provider::{CachingProvider, CryptoProvider};
