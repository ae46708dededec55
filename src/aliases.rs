// src/aliases.rs
//! secure-gate secret types used by crypt-memo

use secure_gate::dynamic_alias;

// Passphrase handed to SQLCipher when the cache stores are keyed
dynamic_alias!(StoreKey, String);
