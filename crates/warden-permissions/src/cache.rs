//! Per-subject result cache
//!
//! Each node maps to a lazily initialised cell. Looking up a missing node
//! inserts an empty cell under a short shard lock, then initialises it
//! outside the map; concurrent callers asking for the same node wait on that
//! cell, so the value is computed once. Callers on other nodes never wait.

use crate::permission::models::PermissionResult;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

type Slot = Arc<OnceCell<PermissionResult>>;

/// Cache performance statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from a computed entry
    pub hits: u64,
    /// Lookups that had to compute
    pub misses: u64,
    /// Entries or whole generations dropped
    pub invalidations: u64,
    /// Entries currently held
    pub entry_count: usize,
}

impl CacheStats {
    /// Hit rate as a percentage (0.0 to 100.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Compute-once cache of resolution results keyed by node
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: DashMap<String, Slot>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl ResultCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for `node`, computing it on first use
    pub fn get_or_compute<F>(&self, node: &str, compute: F) -> PermissionResult
    where
        F: FnOnce() -> PermissionResult,
    {
        let slot = self.slot(node);
        let evict = EvictOnUnwind {
            entries: &self.entries,
            node,
            slot: &slot,
        };

        let mut computed = false;
        let result = *slot.get_or_init(|| {
            computed = true;
            compute()
        });
        drop(evict);

        if computed {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(node, result = %result, "Permission cache miss");
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(node, result = %result, "Permission cache hit");
        }
        result
    }

    /// The computed result for `node`, without computing
    pub fn get(&self, node: &str) -> Option<PermissionResult> {
        self.entries
            .get(node)
            .and_then(|slot| slot.value().get().copied())
    }

    /// Drop the entry for `node`
    pub fn invalidate(&self, node: &str) -> bool {
        let removed = self.entries.remove(node).is_some();
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Drop every entry. Computations already in flight still answer their
    /// callers but their results are not kept.
    pub fn invalidate_all(&self) {
        self.entries.clear();
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of cached nodes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the counters and current size
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            entry_count: self.entries.len(),
        }
    }

    fn slot(&self, node: &str) -> Slot {
        // the map guard must be released before the slot is initialised
        if let Some(slot) = self.entries.get(node) {
            return Arc::clone(slot.value());
        }
        let entry = self.entries.entry(node.to_string()).or_default();
        Arc::clone(entry.value())
    }
}

/// Removes a slot whose computation panicked, unless it was already replaced
struct EvictOnUnwind<'a> {
    entries: &'a DashMap<String, Slot>,
    node: &'a str,
    slot: &'a Slot,
}

impl Drop for EvictOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() && self.slot.get().is_none() {
            self.entries
                .remove_if(self.node, |_, current| Arc::ptr_eq(current, self.slot));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_computes_once_per_node() {
        let cache = ResultCache::new();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            PermissionResult::Allow
        };

        assert_eq!(cache.get_or_compute("a", compute), PermissionResult::Allow);
        assert_eq!(cache.get_or_compute("a", compute), PermissionResult::Allow);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_get_does_not_compute() {
        let cache = ResultCache::new();
        assert_eq!(cache.get("a"), None);
        cache.get_or_compute("a", || PermissionResult::Deny);
        assert_eq!(cache.get("a"), Some(PermissionResult::Deny));
    }

    #[test]
    fn test_invalidate_single_entry() {
        let cache = ResultCache::new();
        cache.get_or_compute("a", || PermissionResult::Allow);
        cache.get_or_compute("b", || PermissionResult::Allow);

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(PermissionResult::Allow));
        assert_eq!(cache.get_or_compute("a", || PermissionResult::Deny), PermissionResult::Deny);
    }

    #[test]
    fn test_invalidate_all() {
        let cache = ResultCache::new();
        cache.get_or_compute("a", || PermissionResult::Allow);
        cache.get_or_compute("b", || PermissionResult::Default);

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 1);
        assert_eq!(cache.get_or_compute("a", || PermissionResult::Deny), PermissionResult::Deny);
    }

    #[test]
    fn test_panicking_computation_leaves_no_entry() {
        let cache = ResultCache::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.get_or_compute("boom", || panic!("broken resolver"))
        }));

        assert!(outcome.is_err());
        assert_eq!(cache.get("boom"), None);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().entry_count, 0);
        assert_eq!(cache.stats().misses, 0);
        assert_eq!(cache.get_or_compute("boom", || PermissionResult::Allow), PermissionResult::Allow);
    }
}
