//! Write-buffered persistent table backed by redb.
//!
//! Writes land in a concurrent in-memory buffer (DashMap) and reach the redb
//! file only on [`PersistentTable::flush`]. Reads check the buffer first,
//! then the file. A table without a file, or one whose file failed, keeps
//! serving from memory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use redb::{Database, ReadableTableMetadata, TableDefinition};

use crate::error::CacheError;

use super::CacheResult;

/// Values that can live in a [`PersistentTable`].
pub trait CacheValue: Clone + PartialEq + Send + Sync + 'static {
    fn encode(&self) -> Vec<u8>;
    fn decode(bytes: &[u8]) -> Option<Self>;
}

impl CacheValue for String {
    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        String::from_utf8(bytes.to_vec()).ok()
    }
}

impl CacheValue for f64 {
    fn encode(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 8] = bytes.try_into().ok()?;
        Some(f64::from_le_bytes(raw))
    }
}

/// String-keyed table with an in-memory write buffer over a redb file.
pub struct PersistentTable<V: CacheValue> {
    table: &'static str,
    path: Option<PathBuf>,
    db: Option<Database>,
    pending: DashMap<String, V>,
    degraded: AtomicBool,
}

impl<V: CacheValue> PersistentTable<V> {
    /// Open or create the redb file at `path` and make sure the table exists.
    pub fn open(path: &Path, table: &'static str) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io { source: e })?;
        }
        let redb_err = |message: String| CacheError::Redb {
            path: path.display().to_string(),
            message,
        };
        let db = Database::create(path).map_err(|e| redb_err(format!("open failed: {e}")))?;

        let txn = db
            .begin_write()
            .map_err(|e| redb_err(format!("begin_write failed: {e}")))?;
        txn.open_table(Self::definition(table))
            .map_err(|e| redb_err(format!("open_table failed: {e}")))?;
        txn.commit()
            .map_err(|e| redb_err(format!("commit failed: {e}")))?;

        Ok(Self {
            table,
            path: Some(path.to_path_buf()),
            db: Some(db),
            pending: DashMap::new(),
            degraded: AtomicBool::new(false),
        })
    }

    /// A table that never touches disk.
    pub fn in_memory(table: &'static str) -> Self {
        Self {
            table,
            path: None,
            db: None,
            pending: DashMap::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Open `path`, falling back to a degraded in-memory table on failure.
    pub fn open_or_degraded(path: &Path, table: &'static str) -> Self {
        match Self::open(path, table) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "cache unavailable, continuing in memory");
                let t = Self::in_memory(table);
                t.degraded.store(true, Ordering::Relaxed);
                t
            }
        }
    }

    fn definition(table: &'static str) -> TableDefinition<'static, &'static str, &'static [u8]> {
        TableDefinition::new(table)
    }

    fn redb_err(&self, message: String) -> CacheError {
        CacheError::Redb {
            path: self
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<memory>".into()),
            message,
        }
    }

    /// Look up `key`: write buffer first, then the file.
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(v) = self.pending.get(key) {
            return Some(v.value().clone());
        }
        match self.read_persisted(key) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, table = self.table, "cache read failed, treating as miss");
                None
            }
        }
    }

    fn read_persisted(&self, key: &str) -> CacheResult<Option<V>> {
        let Some(db) = &self.db else {
            return Ok(None);
        };
        let txn = db
            .begin_read()
            .map_err(|e| self.redb_err(format!("begin_read failed: {e}")))?;
        let table = txn
            .open_table(Self::definition(self.table))
            .map_err(|e| self.redb_err(format!("open_table failed: {e}")))?;
        let guard = table
            .get(key)
            .map_err(|e| self.redb_err(format!("get failed: {e}")))?;
        match guard {
            Some(bytes) => V::decode(bytes.value())
                .map(Some)
                .ok_or_else(|| CacheError::Corrupt { key: key.to_string() }),
            None => Ok(None),
        }
    }

    /// Buffer a write. Visible to `get` immediately, durable after `flush`.
    pub fn put(&self, key: impl Into<String>, value: V) {
        self.pending.insert(key.into(), value);
    }

    /// Write every buffered entry in one transaction.
    ///
    /// On failure the table turns degraded: buffered entries keep serving
    /// reads but later flushes are skipped.
    pub fn flush(&self) -> CacheResult<usize> {
        if self.pending.is_empty() || self.is_degraded() {
            return Ok(0);
        }
        let Some(db) = &self.db else {
            return Ok(0);
        };

        let batch: Vec<(String, V)> = self
            .pending
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let result = (|| -> CacheResult<()> {
            let txn = db
                .begin_write()
                .map_err(|e| self.redb_err(format!("begin_write failed: {e}")))?;
            {
                let mut table = txn
                    .open_table(Self::definition(self.table))
                    .map_err(|e| self.redb_err(format!("open_table failed: {e}")))?;
                for (key, value) in &batch {
                    table
                        .insert(key.as_str(), value.encode().as_slice())
                        .map_err(|e| self.redb_err(format!("insert failed: {e}")))?;
                }
            }
            txn.commit()
                .map_err(|e| self.redb_err(format!("commit failed: {e}")))
        })();

        if let Err(e) = result {
            self.degraded.store(true, Ordering::Relaxed);
            return Err(e);
        }

        // Entries rewritten concurrently since the snapshot stay buffered.
        for (key, value) in &batch {
            self.pending.remove_if(key, |_, current| current == value);
        }
        Ok(batch.len())
    }

    /// Reclaim free space in the file. Returns whether anything was compacted.
    pub fn compact(&mut self) -> CacheResult<bool> {
        let path = self
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match self.db.as_mut() {
            Some(db) => db.compact().map_err(|e| CacheError::Redb {
                path,
                message: format!("compact failed: {e}"),
            }),
            None => Ok(false),
        }
    }

    /// Number of entries in the file (excluding buffered writes).
    pub fn persisted_len(&self) -> CacheResult<u64> {
        let Some(db) = &self.db else {
            return Ok(0);
        };
        let txn = db
            .begin_read()
            .map_err(|e| self.redb_err(format!("begin_read failed: {e}")))?;
        let table = txn
            .open_table(Self::definition(self.table))
            .map_err(|e| self.redb_err(format!("open_table failed: {e}")))?;
        table
            .len()
            .map_err(|e| self.redb_err(format!("len failed: {e}")))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_persistent(&self) -> bool {
        self.db.is_some()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}

impl<V: CacheValue> Drop for PersistentTable<V> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, table = self.table, "final cache flush failed");
        }
    }
}

impl<V: CacheValue> std::fmt::Debug for PersistentTable<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentTable")
            .field("table", &self.table)
            .field("path", &self.path)
            .field("pending", &self.pending.len())
            .field("degraded", &self.is_degraded())
            .finish()
    }
}
