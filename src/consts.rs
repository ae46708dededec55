// src/consts.rs
//! Shared constants — key layout, store layout, defaults

/// Number of SHA-256 bytes kept in a cache key
pub const HASH_LENGTH: usize = 16;

/// Full cache key length: one tag byte plus the truncated hash
pub const KEY_LENGTH: usize = HASH_LENGTH + 1;

/// Tag for keys built from a plaintext (they look up ciphertext)
pub const PLAINTEXT_TAG: u8 = b'p';

/// Tag for keys built from a ciphertext (they look up plaintext)
pub const CIPHERTEXT_TAG: u8 = b'c';

/// Database file inside each generation directory
pub const STORE_FILE_NAME: &str = "cache.db";

/// Default cache directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = ".crypt-memo.cache";

/// Young generation rotates once its store grows past this (100 MiB)
pub const DEFAULT_YOUNG_SIZE_LIMIT: u64 = 100 * 1024 * 1024;

/// Fallback worker count when the host parallelism is unknown
pub const DEFAULT_WORKERS: usize = 4;

/// KDF iterations for SQLCipher-keyed stores
pub const STORE_KDF_ITERATIONS: u32 = 64_000;
