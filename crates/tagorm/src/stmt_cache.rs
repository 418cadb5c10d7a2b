//! Prepared-statement LRU cache.
//!
//! Keyed by the exact SQL sent to the server. Recency is a generation
//! counter: touch is O(1), eviction scans for the smallest generation.
//! Handles evicted by [`StatementCache::add`] or dropped by
//! [`StatementCache::clear`] are handed back so the caller can release them
//! on the connection.

use std::collections::HashMap;

/// Default number of cached statements.
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug)]
struct Entry<H> {
    handle: H,
    recency: u64,
}

/// Bounded LRU map from SQL text to a prepared handle.
#[derive(Debug)]
pub struct StatementCache<H> {
    enabled: bool,
    capacity: usize,
    generation: u64,
    entries: HashMap<String, Entry<H>>,
}

impl<H: Clone> StatementCache<H> {
    pub fn new(capacity: usize, enabled: bool) -> Self {
        Self {
            enabled: enabled && capacity > 0,
            capacity,
            generation: 0,
            entries: HashMap::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, sql: &str) -> bool {
        self.entries.contains_key(sql)
    }

    fn tick(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Look up a handle and mark it most recently used.
    pub fn get(&mut self, sql: &str) -> Option<H> {
        if !self.enabled {
            return None;
        }
        let recency = self.tick();
        let entry = self.entries.get_mut(sql)?;
        entry.recency = recency;
        Some(entry.handle.clone())
    }

    /// Insert a handle. Returns the handle evicted to make room, which the
    /// caller must release. Re-adding an existing key replaces its handle and
    /// returns the old one.
    pub fn add(&mut self, sql: String, handle: H) -> Option<H> {
        if !self.enabled {
            return None;
        }
        let recency = self.tick();
        if let Some(entry) = self.entries.get_mut(&sql) {
            entry.recency = recency;
            return Some(std::mem::replace(&mut entry.handle, handle));
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };
        self.entries.insert(sql, Entry { handle, recency });
        evicted
    }

    fn evict_oldest(&mut self) -> Option<H> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.recency)
            .map(|(k, _)| k.clone())?;
        let entry = self.entries.remove(&oldest)?;
        tracing::trace!(
            target: "tagorm.stmt_cache",
            sql = %oldest,
            "evicted prepared statement"
        );
        Some(entry.handle)
    }

    /// Remove one entry, returning its handle for release.
    pub fn remove(&mut self, sql: &str) -> Option<H> {
        self.entries.remove(sql).map(|e| e.handle)
    }

    /// Remove every entry, returning the handles for release.
    pub fn clear(&mut self) -> Vec<H> {
        self.entries.drain().map(|(_, e)| e.handle).collect()
    }

    /// Forget every entry without releasing the handles. Used when the
    /// connection that owns them is gone.
    pub fn invalidate(&mut self) {
        if !self.entries.is_empty() {
            tracing::trace!(
                target: "tagorm.stmt_cache",
                count = self.entries.len(),
                "invalidated prepared statements"
            );
        }
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(i: usize) -> String {
        format!("SELECT * FROM t{i} WHERE id = $1")
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = StatementCache::new(3, true);
        for i in 0..3 {
            assert_eq!(cache.add(key(i), i), None);
        }
        assert_eq!(cache.add(key(3), 3), Some(0));
        assert!(!cache.contains(&key(0)));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn touched_entry_survives_until_oldest() {
        let mut cache = StatementCache::new(3, true);
        for i in 0..3 {
            cache.add(key(i), i);
        }
        assert_eq!(cache.get(&key(0)), Some(0));
        // 1 is now the oldest.
        assert_eq!(cache.add(key(3), 3), Some(1));
        assert_eq!(cache.add(key(4), 4), Some(2));
        assert_eq!(cache.add(key(5), 5), Some(0));
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let mut cache = StatementCache::disabled();
        assert_eq!(cache.add(key(0), 0), None);
        assert_eq!(cache.get(&key(0)), None);
        assert!(cache.is_empty());

        let zero = StatementCache::<u8>::new(0, true);
        assert!(!zero.is_enabled());
    }

    #[test]
    fn clear_returns_handles_and_invalidate_drops_them() {
        let mut cache = StatementCache::new(4, true);
        cache.add(key(0), 0);
        cache.add(key(1), 1);
        let mut released = cache.clear();
        released.sort_unstable();
        assert_eq!(released, vec![0, 1]);

        cache.add(key(2), 2);
        cache.invalidate();
        assert!(cache.is_empty());
    }

    #[test]
    fn readding_replaces_handle() {
        let mut cache = StatementCache::new(2, true);
        cache.add(key(0), 0);
        assert_eq!(cache.add(key(0), 10), Some(0));
        assert_eq!(cache.get(&key(0)), Some(10));
        assert_eq!(cache.remove(&key(0)), Some(10));
    }
}
