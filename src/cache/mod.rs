//! Persistent memoization for expensive similarity work.
//!
//! Two independent stores:
//!
//! - a generic `String → String` memo (keyword extraction results),
//! - a symmetric `(String, String) → f64` distance memo.
//!
//! Entries are never invalidated: the cache only saves time, a cold cache
//! yields the same decisions as a warm one. Writes are buffered and flushed
//! on [`DistanceCache::flush`] / [`DistanceCache::close`]; dropping the cache
//! flushes as well. Closing compacts the files with a small probability so
//! the cost of reclaiming space is amortized across runs.

pub mod table;

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;

use crate::config::CacheConfig;
use crate::error::CacheError;

use table::PersistentTable;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

const MEMO_TABLE: &str = "cache";
const DISTANCE_TABLE: &str = "distance";

/// Separates the two halves of a pair key. Never produced by normalized text.
const PAIR_SEPARATOR: char = '\u{1f}';

/// Entry counts, for `authlink cache stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub memo_persisted: u64,
    pub memo_pending: usize,
    pub distance_persisted: u64,
    pub distance_pending: usize,
    pub degraded: bool,
}

/// What [`DistanceCache::close`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseReport {
    pub flushed: usize,
    pub compacted: bool,
}

/// The memo and distance stores, with an explicit open/flush/close lifecycle.
#[derive(Debug)]
pub struct DistanceCache {
    memo: PersistentTable<String>,
    distances: PersistentTable<f64>,
    compaction_probability: f64,
}

impl DistanceCache {
    /// Open both stores. Stores without a configured file stay in memory.
    pub fn open(config: &CacheConfig) -> CacheResult<Self> {
        let memo = match &config.memo_file {
            Some(path) => PersistentTable::open(path, MEMO_TABLE)?,
            None => PersistentTable::in_memory(MEMO_TABLE),
        };
        let distances = match &config.distance_file {
            Some(path) => PersistentTable::open(path, DISTANCE_TABLE)?,
            None => PersistentTable::in_memory(DISTANCE_TABLE),
        };
        Ok(Self {
            memo,
            distances,
            compaction_probability: config.compaction_probability,
        })
    }

    /// Like [`open`](Self::open), but a store that cannot be opened is
    /// replaced by a degraded in-memory one instead of failing.
    pub fn open_best_effort(config: &CacheConfig) -> Self {
        fn open<V: table::CacheValue>(
            path: &Option<std::path::PathBuf>,
            table: &'static str,
        ) -> PersistentTable<V> {
            match path {
                Some(p) => PersistentTable::open_or_degraded(p, table),
                None => PersistentTable::in_memory(table),
            }
        }
        Self {
            memo: open(&config.memo_file, MEMO_TABLE),
            distances: open(&config.distance_file, DISTANCE_TABLE),
            compaction_probability: config.compaction_probability,
        }
    }

    /// Both stores in memory only.
    pub fn in_memory() -> Self {
        Self {
            memo: PersistentTable::in_memory(MEMO_TABLE),
            distances: PersistentTable::in_memory(DISTANCE_TABLE),
            compaction_probability: 0.0,
        }
    }

    /// Open the cache, run `f`, then close it whatever `f` returned.
    ///
    /// If `f` leaked a clone of the `Arc`, the cache can't be closed here;
    /// it is flushed instead and finalized when the last clone drops.
    pub fn scoped<T>(config: &CacheConfig, f: impl FnOnce(&Arc<DistanceCache>) -> T) -> T {
        let cache = Arc::new(Self::open_best_effort(config));
        let out = f(&cache);
        match Arc::try_unwrap(cache) {
            Ok(cache) => match cache.close() {
                Ok(report) => {
                    tracing::debug!(flushed = report.flushed, compacted = report.compacted, "cache closed")
                }
                Err(e) => tracing::warn!(error = %e, "cache close failed"),
            },
            Err(shared) => {
                if let Err(e) = shared.flush() {
                    tracing::warn!(error = %e, "cache flush failed");
                }
            }
        }
        out
    }

    // -- generic memo ------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<String> {
        self.memo.get(key)
    }

    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.memo.put(key, value.into());
    }

    // -- symmetric distances -----------------------------------------------

    fn pair_key(a: &str, b: &str) -> String {
        format!("{a}{PAIR_SEPARATOR}{b}")
    }

    fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
        if a <= b { (a, b) } else { (b, a) }
    }

    /// Distance for the unordered pair `{a, b}`.
    ///
    /// The canonical (ordered) key is tried first, then the reverse ordering,
    /// which covers entries written by tools that did not canonicalize.
    pub fn distance(&self, a: &str, b: &str) -> Option<f64> {
        let (lo, hi) = Self::ordered(a, b);
        self.distances
            .get(&Self::pair_key(lo, hi))
            .or_else(|| self.distances.get(&Self::pair_key(hi, lo)))
    }

    /// Store the distance for the unordered pair `{a, b}`.
    pub fn put_distance(&self, a: &str, b: &str, distance: f64) {
        let (lo, hi) = Self::ordered(a, b);
        self.distances.put(Self::pair_key(lo, hi), distance);
    }

    /// Cached distance, computing and storing it on a miss.
    pub fn distance_or_insert_with(&self, a: &str, b: &str, compute: impl FnOnce() -> f64) -> f64 {
        if let Some(d) = self.distance(a, b) {
            return d;
        }
        let d = compute();
        self.put_distance(a, b, d);
        d
    }

    // -- lifecycle -----------------------------------------------------------

    /// Persist buffered writes of both stores. Returns the number written.
    ///
    /// Both stores are attempted even if the first one fails.
    pub fn flush(&self) -> CacheResult<usize> {
        let memo = self.memo.flush();
        let distances = self.distances.flush();
        Ok(memo? + distances?)
    }

    /// Flush, maybe compact, and release the files.
    pub fn close(mut self) -> CacheResult<CloseReport> {
        let flushed = self.flush()?;
        let p = self.compaction_probability.clamp(0.0, 1.0);
        let compacted = if p > 0.0 && rand::thread_rng().gen_bool(p) {
            self.compact()?
        } else {
            false
        };
        Ok(CloseReport { flushed, compacted })
    }

    /// Compact both files now.
    pub fn compact(&mut self) -> CacheResult<bool> {
        let memo = self.memo.compact()?;
        let distances = self.distances.compact()?;
        Ok(memo || distances)
    }

    pub fn stats(&self) -> CacheResult<CacheStats> {
        Ok(CacheStats {
            memo_persisted: self.memo.persisted_len()?,
            memo_pending: self.memo.pending_len(),
            distance_persisted: self.distances.persisted_len()?,
            distance_pending: self.distances.pending_len(),
            degraded: self.is_degraded(),
        })
    }

    pub fn is_degraded(&self) -> bool {
        self.memo.is_degraded() || self.distances.is_degraded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_config(dir: &TempDir) -> CacheConfig {
        CacheConfig {
            memo_file: Some(dir.path().join("data.redb")),
            distance_file: Some(dir.path().join("distance.redb")),
            compaction_probability: 0.0,
        }
    }

    #[test]
    fn lookup_is_symmetric() {
        let cache = DistanceCache::in_memory();
        cache.put_distance("ontology", "semantic web", 0.3);
        assert_eq!(cache.distance("ontology", "semantic web"), Some(0.3));
        assert_eq!(cache.distance("semantic web", "ontology"), Some(0.3));
    }

    #[test]
    fn latest_write_wins_for_either_order() {
        let cache = DistanceCache::in_memory();
        cache.put_distance("a", "b", 0.1);
        cache.put_distance("b", "a", 0.9);
        assert_eq!(cache.distance("a", "b"), Some(0.9));
        assert_eq!(cache.distance("b", "a"), Some(0.9));
    }

    #[test]
    fn reverse_key_fallback_reads_uncanonical_entries() {
        let cache = DistanceCache::in_memory();
        // Written by hand in non-canonical order.
        cache.distances.put(DistanceCache::pair_key("zeta", "alpha"), 0.4);
        assert_eq!(cache.distance("alpha", "zeta"), Some(0.4));
        assert_eq!(cache.distance("zeta", "alpha"), Some(0.4));
    }

    #[test]
    fn compute_runs_once_per_pair() {
        let cache = DistanceCache::in_memory();
        let mut calls = 0;
        let d1 = cache.distance_or_insert_with("x", "y", || {
            calls += 1;
            0.5
        });
        let d2 = cache.distance_or_insert_with("y", "x", || {
            calls += 1;
            0.7
        });
        assert_eq!((d1, d2), (0.5, 0.5));
        assert_eq!(calls, 1);
    }

    #[test]
    fn memo_store_is_independent() {
        let cache = DistanceCache::in_memory();
        cache.put("a\u{1f}b", "memo");
        assert_eq!(cache.distance("a", "b"), None);
        assert_eq!(cache.get("a\u{1f}b"), Some("memo".into()));
    }

    #[test]
    fn close_persists_and_reopen_reads() {
        let dir = TempDir::new().unwrap();
        let config = file_config(&dir);
        {
            let cache = DistanceCache::open(&config).unwrap();
            cache.put("kw:title", "ontology\nsparql");
            cache.put_distance("ontology", "sparql", 0.6);
            let report = cache.close().unwrap();
            assert_eq!(report.flushed, 2);
            assert!(!report.compacted);
        }
        let cache = DistanceCache::open(&config).unwrap();
        assert_eq!(cache.get("kw:title"), Some("ontology\nsparql".into()));
        assert_eq!(cache.distance("sparql", "ontology"), Some(0.6));
    }

    #[test]
    fn close_with_certain_compaction() {
        let dir = TempDir::new().unwrap();
        let config = CacheConfig {
            compaction_probability: 1.0,
            ..file_config(&dir)
        };
        let cache = DistanceCache::open(&config).unwrap();
        cache.put_distance("a", "b", 0.2);
        cache.close().unwrap();

        let cache = DistanceCache::open(&config).unwrap();
        assert_eq!(cache.distance("a", "b"), Some(0.2));
    }

    #[test]
    fn scoped_flushes_on_exit() {
        let dir = TempDir::new().unwrap();
        let config = file_config(&dir);
        let n = DistanceCache::scoped(&config, |cache| {
            cache.put_distance("p", "q", 0.1);
            7
        });
        assert_eq!(n, 7);
        let cache = DistanceCache::open(&config).unwrap();
        assert_eq!(cache.stats().unwrap().distance_persisted, 1);
    }

    #[test]
    fn concurrent_writers() {
        let cache = Arc::new(DistanceCache::in_memory());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.put_distance(&format!("w{i}"), "shared", i as f64 / 16.0);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.distance("shared", "w3"), Some(3.0 / 16.0));
        assert_eq!(cache.stats().unwrap().distance_pending, 16);
    }
}
