// src/db/store_conn.rs
use crate::aliases::StoreKey;
use crate::consts::STORE_KDF_ITERATIONS;
use rusqlite::{Connection, OpenFlags, Result};
use std::path::Path;

/// Open (or create) one generation's database file.
///
/// The WAL journal with `synchronous = FULL` makes every committed
/// transaction durable and lets SQLite roll back a torn write on the
/// next open.
pub fn open_store(db_path: &Path, key: Option<&StoreKey>) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    if let Some(key) = key {
        apply_key(&conn, key)?;
    }

    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = FULL;

        CREATE TABLE IF NOT EXISTS entries (
            key   BLOB PRIMARY KEY,
            value BLOB NOT NULL
        ) WITHOUT ROWID;
        "#,
    )?;

    Ok(conn)
}

/// Open an existing database file without write access.
///
/// No pragma or schema statement runs against the file; the file must
/// already have been created by [`open_store`].
pub fn open_store_read_only(db_path: &Path, key: Option<&StoreKey>) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    if let Some(key) = key {
        apply_key(&conn, key)?;
    }

    // First read of the schema; a wrong key fails here
    conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |_| Ok(()))?;

    Ok(conn)
}

fn apply_key(conn: &Connection, key: &StoreKey) -> Result<()> {
    conn.pragma_update(None, "key", key.expose_secret())?;
    conn.execute_batch(&format!(
        r#"
        PRAGMA cipher_page_size = 4096;
        PRAGMA kdf_iter = {STORE_KDF_ITERATIONS};
        PRAGMA cipher_hmac_algorithm = HMAC_SHA512;
        PRAGMA cipher_kdf_algorithm = PBKDF2_HMAC_SHA512;
        "#
    ))
}
