//! Store operations for a single cache generation
//!
//! Each generation is one SQLite database with a single `entries`
//! table keyed by [`CacheKey`]. The connection sits behind a mutex so
//! the store can be shared across worker threads; SQLite never sees
//! two statements from this handle at once.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension, Result, TransactionBehavior};

use crate::aliases::StoreKey;
use crate::db::store_conn::{open_store, open_store_read_only};
use crate::key::CacheKey;

pub struct KvStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl KvStore {
    pub fn open<P: AsRef<Path>>(db_path: P, key: Option<&StoreKey>) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let conn = open_store(&path, key)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Open an existing store for lookups only; writes fail with `SQLITE_READONLY`
    pub fn open_read_only<P: AsRef<Path>>(db_path: P, key: Option<&StoreKey>) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let conn = open_store_read_only(&path, key)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // A panic in another worker does not leave the connection half-used:
    // every statement below completes or errors before the guard drops.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        self.lock()
            .query_row(
                "SELECT value FROM entries WHERE key = ?1",
                [key.as_bytes()],
                |row| row.get(0),
            )
            .optional()
    }

    pub fn has(&self, key: &CacheKey) -> Result<bool> {
        self.lock().query_row(
            "SELECT EXISTS(SELECT 1 FROM entries WHERE key = ?1)",
            [key.as_bytes()],
            |row| row.get(0),
        )
    }

    /// Write both records of a pair in one transaction
    pub fn put_pair(&self, records: [(CacheKey, &[u8]); 2]) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for (key, value) in records {
            tx.execute(
                "INSERT OR REPLACE INTO entries (key, value) VALUES (?1, ?2)",
                params![key.as_bytes(), value],
            )?;
        }
        // Commit is the sync point under synchronous = FULL
        tx.commit()
    }

    /// Number of records (two per cached pair)
    pub fn len(&self) -> Result<u64> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Fold the WAL into the main file and rebuild it without free pages
    pub fn merge(&self) -> Result<()> {
        self.lock().execute_batch(
            r#"
            PRAGMA wal_checkpoint(TRUNCATE);
            VACUUM;
            "#,
        )
    }

    /// On-disk size of the main database file, in bytes
    pub fn size(&self) -> Result<u64> {
        let conn = self.lock();
        let page_count: i64 = conn.pragma_query_value(None, "page_count", |row| row.get(0))?;
        let page_size: i64 = conn.pragma_query_value(None, "page_size", |row| row.get(0))?;
        Ok((page_count.max(0) as u64) * (page_size.max(0) as u64))
    }

    pub fn close(self) -> Result<()> {
        let conn = self.conn.into_inner().unwrap_or_else(PoisonError::into_inner);
        conn.close().map_err(|(_, e)| e)
    }
}
