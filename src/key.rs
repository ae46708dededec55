// src/key.rs
//! Content-addressed cache keys
//!
//! A key is a one-byte direction tag followed by the first
//! [`HASH_LENGTH`] bytes of the payload's SHA-256 digest.
//! Collisions on the truncated digest are not handled.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::consts::{CIPHERTEXT_TAG, HASH_LENGTH, KEY_LENGTH, PLAINTEXT_TAG};

/// Which direction a key indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Built from a plaintext; maps to its ciphertext
    Plaintext,
    /// Built from a ciphertext; maps to its plaintext
    Ciphertext,
}

impl KeyKind {
    pub const fn tag(self) -> u8 {
        match self {
            KeyKind::Plaintext => PLAINTEXT_TAG,
            KeyKind::Ciphertext => CIPHERTEXT_TAG,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; KEY_LENGTH]);

impl CacheKey {
    fn derive(kind: KeyKind, payload: &[u8]) -> Self {
        let digest = Sha256::digest(payload);
        let mut key = [0u8; KEY_LENGTH];
        key[0] = kind.tag();
        key[1..].copy_from_slice(&digest[..HASH_LENGTH]);
        CacheKey(key)
    }

    pub fn kind(&self) -> KeyKind {
        if self.0[0] == PLAINTEXT_TAG {
            KeyKind::Plaintext
        } else {
            KeyKind::Ciphertext
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for CacheKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({self})")
    }
}

/// Key used to look up the ciphertext of `plaintext`
pub fn key_for_plaintext(plaintext: &str) -> CacheKey {
    CacheKey::derive(KeyKind::Plaintext, plaintext.as_bytes())
}

/// Key used to look up the plaintext of `ciphertext`
pub fn key_for_ciphertext(ciphertext: &[u8]) -> CacheKey {
    CacheKey::derive(KeyKind::Ciphertext, ciphertext)
}
