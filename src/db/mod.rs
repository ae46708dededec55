// src/db/mod.rs
//! Persistent key-value store behind each cache generation

pub mod store_conn;
pub mod store_ops;

pub use store_conn::{open_store, open_store_read_only};
pub use store_ops::KvStore;
