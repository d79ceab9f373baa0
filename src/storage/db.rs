//! sled-backed ordered key-value store.
//!
//! Thin wrapper around a [`sled::Db`] providing the operations the store
//! needs: point reads and writes, prefix-bounded iteration, and atomic write
//! batches with read-your-writes staging.
//!
//! # Durability
//!
//! sled persists asynchronously by default. Operations that must survive a
//! crash (anything completing a store operation) pass `durable = true`,
//! which blocks on a flush of the underlying log.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::StoreError;

use super::keys::prefix_successor;

// =============================================================================
// Database
// =============================================================================

/// Ordered byte-keyed store backing all four collections.
#[derive(Debug, Clone)]
pub struct Database {
    db: sled::Db,
}

impl Database {
    /// Open (or create) the database at the given filesystem path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Point read. Returns `None` on a miss.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    /// Whether a key exists.
    pub fn contains_key(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.db.contains_key(key)?)
    }

    /// Point write.
    pub fn put(&self, key: &[u8], value: &[u8], durable: bool) -> Result<(), StoreError> {
        self.db.insert(key, value)?;
        if durable {
            self.db.flush()?;
        }
        Ok(())
    }

    /// Point delete.
    pub fn delete(&self, key: &[u8], durable: bool) -> Result<(), StoreError> {
        self.db.remove(key)?;
        if durable {
            self.db.flush()?;
        }
        Ok(())
    }

    /// Iterate all `(key, value)` pairs carrying `prefix`, in ascending key
    /// order.
    ///
    /// The iterator's upper bound is the prefix's successor key, so iteration
    /// never crosses into a neighboring collection.
    pub fn iter_prefix(
        &self,
        prefix: &[u8],
    ) -> impl Iterator<Item = Result<(Vec<u8>, Vec<u8>), StoreError>> {
        let start = prefix.to_vec();
        let iter = match prefix_successor(prefix) {
            Some(end) => self.db.range(start..end),
            None => self.db.range(start..),
        };
        iter.map(|entry| {
            entry
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(StoreError::from)
        })
    }

    /// Start an empty write batch against this database.
    pub fn batch(&self) -> WriteBatch<'_> {
        WriteBatch {
            db: self,
            batch: sled::Batch::default(),
            staged: BTreeMap::new(),
        }
    }

    /// Block until all pending writes are on disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

// =============================================================================
// Write Batch
// =============================================================================

/// A staged set of writes applied atomically at commit.
///
/// Staged writes are invisible to other readers until [`commit`] and appear
/// all at once; dropping the batch without committing discards everything.
/// [`get`] reads through the batch, overlaying staged writes on the committed
/// state, which is the view the orchestrator's delta decision needs.
///
/// [`commit`]: WriteBatch::commit
/// [`get`]: WriteBatch::get
pub struct WriteBatch<'a> {
    db: &'a Database,
    batch: sled::Batch,
    staged: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl WriteBatch<'_> {
    /// Stage a write.
    pub fn put(&mut self, key: &[u8], value: Vec<u8>) {
        self.batch.insert(key, value.clone());
        self.staged.insert(key.to_vec(), Some(value));
    }

    /// Stage a delete.
    pub fn delete(&mut self, key: &[u8]) {
        self.batch.remove(key);
        self.staged.insert(key.to_vec(), None);
    }

    /// Read through the batch: staged writes first, then the committed
    /// state. A staged delete reads as a miss.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(staged) = self.staged.get(key) {
            return Ok(staged.clone());
        }
        self.db.get(key)
    }

    /// Whether a key is visible through the batch.
    pub fn contains_key(&self, key: &[u8]) -> Result<bool, StoreError> {
        if let Some(staged) = self.staged.get(key) {
            return Ok(staged.is_some());
        }
        self.db.contains_key(key)
    }

    /// Apply all staged writes atomically.
    pub fn commit(self, durable: bool) -> Result<(), StoreError> {
        self.db.db.apply_batch(self.batch)?;
        if durable {
            self.db.flush()?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
