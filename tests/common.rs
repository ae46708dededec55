// tests/common.rs
//! Shared test utilities — logging setup, throwaway cache roots, fake provider

#![allow(dead_code)] // each test binary uses a different subset

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crypt_memo::consts::STORE_FILE_NAME;
use crypt_memo::db::KvStore;
use crypt_memo::{
    key_for_ciphertext, key_for_plaintext, CacheOptions, CryptoProvider, Generation,
    ProviderError, TieredCache,
};
use tempfile::TempDir;

#[cfg(feature = "logging")]
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize test-friendly logging
/// Call once at the start of any test that needs logs
pub fn setup() {
    #[cfg(feature = "logging")]
    tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok(); // idempotent — safe to call multiple times

    #[cfg(not(feature = "logging"))]
    { /* no-op */ }
}

/// A cache root that disappears with the test
pub struct TestCache {
    dir: TempDir,
}

impl TestCache {
    pub fn new() -> Self {
        setup();
        Self {
            dir: tempfile::tempdir().expect("create temp cache root"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn generation_dir(&self, generation: Generation) -> PathBuf {
        self.root().join(generation.dir_name())
    }

    pub fn open(&self) -> TieredCache {
        TieredCache::open(self.root()).expect("open cache")
    }

    pub fn open_with_limit(&self, young_size_limit: u64) -> TieredCache {
        let options = CacheOptions {
            young_size_limit,
            ..CacheOptions::default()
        };
        TieredCache::open_with(self.root(), &options).expect("open cache")
    }

    /// Write pairs straight into the old generation, bypassing the cache
    pub fn seed_old(&self, pairs: &[(&str, &[u8])]) {
        let dir = self.generation_dir(Generation::Old);
        fs::create_dir_all(&dir).expect("create old dir");
        let store = KvStore::open(dir.join(STORE_FILE_NAME), None).expect("open old store");
        for (plaintext, ciphertext) in pairs {
            store
                .put_pair([
                    (key_for_plaintext(plaintext), *ciphertext),
                    (key_for_ciphertext(ciphertext), plaintext.as_bytes()),
                ])
                .expect("seed old store");
        }
        store.close().expect("close old store");
    }

    /// Drop the old generation from disk entirely
    pub fn detach_old(&self) {
        fs::remove_dir_all(self.generation_dir(Generation::Old)).expect("remove old dir");
    }
}

/// Reversible stand-in for a real crypto provider.
///
/// Ciphertext is `enc:` followed by the reversed plaintext bytes.
/// Encrypting [`FakeProvider::POISON`] fails.
#[derive(Default)]
pub struct FakeProvider {
    encrypts: AtomicUsize,
    decrypts: AtomicUsize,
}

impl FakeProvider {
    pub const POISON: &'static str = "poison";

    pub fn seal(plaintext: &str) -> Vec<u8> {
        let mut out = b"enc:".to_vec();
        out.extend(plaintext.bytes().rev());
        out
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypts.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypts.load(Ordering::SeqCst)
    }
}

impl CryptoProvider for FakeProvider {
    fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, ProviderError> {
        self.encrypts.fetch_add(1, Ordering::SeqCst);
        if plaintext == Self::POISON {
            return Err("provider refused value".into());
        }
        Ok(Self::seal(plaintext))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<String, ProviderError> {
        self.decrypts.fetch_add(1, Ordering::SeqCst);
        let body = ciphertext
            .strip_prefix(b"enc:".as_slice())
            .ok_or("not produced by FakeProvider")?;
        let bytes: Vec<u8> = body.iter().rev().copied().collect();
        Ok(String::from_utf8(bytes)?)
    }
}
