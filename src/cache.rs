// src/cache.rs
//! Two-generation, content-addressed memo of plaintext ↔ ciphertext pairs
//!
//! New pairs go into the read/write **young** generation. The **old**
//! generation is a frozen copy of an earlier young one: it is only read,
//! and any hit found there is copied forward into young. When young has
//! grown past its size limit at close, old is dropped and young takes
//! its place, so pairs that were not touched for a whole generation
//! age out.
//!
//! ```text
//! <root>/young/cache.db   read/write
//! <root>/old/cache.db     read-only, replaced wholesale on rotation
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::ops::Index;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::aliases::StoreKey;
use crate::consts::{DEFAULT_YOUNG_SIZE_LIMIT, STORE_FILE_NAME};
use crate::db::KvStore;
use crate::error::{CoreError, Result};
use crate::key::{key_for_ciphertext, key_for_plaintext, CacheKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    Young,
    Old,
}

impl Generation {
    pub const fn dir_name(self) -> &'static str {
        match self {
            Generation::Young => "young",
            Generation::Old => "old",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Generation::Young => 0,
            Generation::Old => 1,
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Knobs for [`TieredCache::open_with`]
#[derive(Clone)]
pub struct CacheOptions {
    /// Rotate at close once young's store is larger than this many bytes
    pub young_size_limit: u64,
    /// Key both stores with SQLCipher
    pub store_key: Option<StoreKey>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            young_size_limit: DEFAULT_YOUNG_SIZE_LIMIT,
            store_key: None,
        }
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("young_size_limit", &self.young_size_limit)
            .field("keyed", &self.store_key.is_some())
            .finish()
    }
}

/// What [`TieredCache::close`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseReport {
    /// Young's size after compaction, in bytes
    pub young_size: u64,
    /// Whether young replaced old
    pub rotated: bool,
}

pub struct TieredCache {
    // indexed by Generation::slot
    stores: [KvStore; 2],
    root: PathBuf,
    young_size_limit: u64,
}

impl Index<Generation> for TieredCache {
    type Output = KvStore;

    fn index(&self, generation: Generation) -> &KvStore {
        &self.stores[generation.slot()]
    }
}

impl TieredCache {
    /// Open with default options
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::open_with(root, &CacheOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(root: P, options: &CacheOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let young = open_generation(&root, Generation::Young, options.store_key.as_ref())?;
        let old = open_generation(&root, Generation::Old, options.store_key.as_ref())?;

        info!(
            root = %root.display(),
            keyed = options.store_key.is_some(),
            "opened cache"
        );

        Ok(Self {
            stores: [young, old],
            root,
            young_size_limit: options.young_size_limit,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `key` is stored in `generation`, without promotion
    pub fn contains(&self, generation: Generation, key: &CacheKey) -> Result<bool> {
        Ok(self[generation].has(key)?)
    }

    /// Look up the ciphertext previously paired with `plaintext`
    pub fn lookup_ciphertext(&self, plaintext: &str) -> Result<Option<Vec<u8>>> {
        let key = key_for_plaintext(plaintext);
        if let Some(ciphertext) = self[Generation::Young].get(&key)? {
            return Ok(Some(ciphertext));
        }
        match self[Generation::Old].get(&key)? {
            Some(ciphertext) => {
                debug!(%key, "promoting pair from old generation");
                self.put(plaintext, &ciphertext)?;
                Ok(Some(ciphertext))
            }
            None => Ok(None),
        }
    }

    /// Look up the plaintext previously paired with `ciphertext`
    pub fn lookup_plaintext(&self, ciphertext: &[u8]) -> Result<Option<String>> {
        let key = key_for_ciphertext(ciphertext);
        if let Some(plaintext) = self[Generation::Young].get(&key)? {
            return Ok(Some(String::from_utf8(plaintext)?));
        }
        match self[Generation::Old].get(&key)? {
            Some(plaintext) => {
                let plaintext = String::from_utf8(plaintext)?;
                debug!(%key, "promoting pair from old generation");
                self.put(&plaintext, ciphertext)?;
                Ok(Some(plaintext))
            }
            None => Ok(None),
        }
    }

    /// Record a (plaintext, ciphertext) pair in young, both directions at once
    pub fn put(&self, plaintext: &str, ciphertext: &[u8]) -> Result<()> {
        self[Generation::Young].put_pair([
            (key_for_plaintext(plaintext), ciphertext),
            (key_for_ciphertext(ciphertext), plaintext.as_bytes()),
        ])?;
        Ok(())
    }

    /// Compact young, close both stores, and rotate if young is too big.
    ///
    /// Both stores are closed even when compaction fails. Failures are
    /// reported in priority order: store close, then merge, then size.
    pub fn close(self) -> Result<CloseReport> {
        let TieredCache {
            stores: [young, old],
            root,
            young_size_limit,
        } = self;

        let merged = young.merge();
        let measured = young.size();

        let mut errors = Vec::new();
        for (generation, store) in [(Generation::Young, young), (Generation::Old, old)] {
            if let Err(source) = store.close() {
                errors.push(CoreError::StoreClose { generation, source });
            }
        }
        errors.extend(merged.err().map(CoreError::Store));
        let young_size = match measured {
            Ok(size) => size,
            Err(e) => {
                errors.push(CoreError::Store(e));
                0
            }
        };
        if let Some(err) = CoreError::collect(errors) {
            return Err(err);
        }

        if young_size <= young_size_limit {
            debug!(young_size, young_size_limit, "young generation within limit");
            return Ok(CloseReport {
                young_size,
                rotated: false,
            });
        }

        rotate(&root)?;
        info!(
            young_size,
            young_size_limit,
            root = %root.display(),
            "rotated young generation into old"
        );
        Ok(CloseReport {
            young_size,
            rotated: true,
        })
    }
}

/// Open one generation's store. Old is opened read-only, after an empty
/// store has been created for it if none exists yet.
fn open_generation(root: &Path, generation: Generation, key: Option<&StoreKey>) -> Result<KvStore> {
    let dir = root.join(generation.dir_name());
    fs::create_dir_all(&dir).map_err(|source| CoreError::GenerationDir {
        generation,
        path: dir.clone(),
        source,
    })?;
    let path = dir.join(STORE_FILE_NAME);

    let opened = match generation {
        Generation::Young => KvStore::open(&path, key),
        Generation::Old if path.exists() => KvStore::open_read_only(&path, key),
        Generation::Old => KvStore::open(&path, key)
            .and_then(KvStore::close)
            .and_then(|()| KvStore::open_read_only(&path, key)),
    };
    opened.map_err(|source| CoreError::StoreOpen {
        generation,
        path,
        source,
    })
}

/// Discard `old` and move `young` into its place.
///
/// The next open recreates an empty `young`.
fn rotate(root: &Path) -> Result<()> {
    let young = root.join(Generation::Young.dir_name());
    let old = root.join(Generation::Old.dir_name());

    match fs::remove_dir_all(&old) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %old.display(), "old generation already missing");
        }
        Err(source) => return Err(CoreError::Rotation { path: old, source }),
    }

    fs::rename(&young, &old).map_err(|source| CoreError::Rotation {
        path: young,
        source,
    })
}
