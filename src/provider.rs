// src/provider.rs
//! The external encrypt/decrypt capability and its cache-backed wrapper

use tracing::trace;

use crate::cache::TieredCache;
use crate::error::ProviderError;

/// An opaque encrypt/decrypt transform.
///
/// Implementations are shared across pipeline workers, so they must be
/// `Sync`. Any retry policy belongs here, not in the pipeline.
pub trait CryptoProvider: Sync {
    fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, ProviderError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<String, ProviderError>;
}

/// Memoizes an inner provider through a [`TieredCache`].
///
/// A hit in either direction skips the inner provider entirely; a miss
/// calls it and records the resulting pair for both directions.
pub struct CachingProvider<'c, P> {
    inner: P,
    cache: &'c TieredCache,
}

impl<'c, P: CryptoProvider> CachingProvider<'c, P> {
    pub fn new(inner: P, cache: &'c TieredCache) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: CryptoProvider> CryptoProvider for CachingProvider<'_, P> {
    fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, ProviderError> {
        if let Some(ciphertext) = self.cache.lookup_ciphertext(plaintext)? {
            trace!("encrypt served from cache");
            return Ok(ciphertext);
        }
        let ciphertext = self.inner.encrypt(plaintext)?;
        self.cache.put(plaintext, &ciphertext)?;
        Ok(ciphertext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<String, ProviderError> {
        if let Some(plaintext) = self.cache.lookup_plaintext(ciphertext)? {
            trace!("decrypt served from cache");
            return Ok(plaintext);
        }
        let plaintext = self.inner.decrypt(ciphertext)?;
        self.cache.put(&plaintext, ciphertext)?;
        Ok(plaintext)
    }
}
