//! # TopicMap: sharded topic → value storage.
//!
//! Thin adapter over [`dashmap::DashMap`] exposing only the primitives the bus needs.
//! Each call is atomic with respect to other calls on the same key (one shard critical
//! section); calls on keys in different shards do not contend.
//!
//! ## Rules
//! - Callbacks run **inside** the shard lock: they must be short and must not touch
//!   the map again.
//! - Values are cloned out (`get`, `snapshot`, `drain`) so callers never hold a shard
//!   guard while doing real work.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Concurrent map keyed by topic name.
pub(crate) struct TopicMap<V> {
    inner: DashMap<String, V>,
}

impl<V: Clone> TopicMap<V> {
    pub(crate) fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Returns a clone of the value for `key`.
    pub(crate) fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).map(|v| v.value().clone())
    }

    /// Inserts or replaces the value for `key` with `update(current)`.
    pub(crate) fn upsert(&self, key: &str, update: impl FnOnce(Option<&V>) -> V) {
        match self.inner.entry(key.to_owned()) {
            Entry::Occupied(mut e) => {
                let next = update(Some(e.get()));
                e.insert(next);
            }
            Entry::Vacant(e) => {
                e.insert(update(None));
            }
        }
    }

    /// Replaces the value for `key` with `update(current)` if present.
    ///
    /// Returns `false` when `key` is absent (`update` is not called).
    pub(crate) fn update(&self, key: &str, update: impl FnOnce(&V) -> V) -> bool {
        match self.inner.get_mut(key) {
            Some(mut v) => {
                let next = update(v.value());
                *v = next;
                true
            }
            None => false,
        }
    }

    /// Removes `key` if present and `predicate(value)` holds.
    pub(crate) fn remove_if(&self, key: &str, predicate: impl FnOnce(&V) -> bool) -> Option<V> {
        self.inner
            .remove_if(key, |_, v| predicate(v))
            .map(|(_, v)| v)
    }

    /// Point-in-time copy of every entry.
    ///
    /// Entries inserted or removed concurrently may or may not be observed.
    pub(crate) fn snapshot(&self) -> Vec<(String, V)> {
        self.inner
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Removes every entry, shard by shard, and returns the removed values.
    pub(crate) fn drain(&self) -> Vec<V> {
        let mut removed = Vec::new();
        self.inner.retain(|_, v| {
            removed.push(v.clone());
            false
        });
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_upsert_inserts_then_updates() {
        let map = TopicMap::<u32>::new();
        map.upsert("a", |old| {
            assert!(old.is_none());
            1
        });
        map.upsert("a", |old| old.copied().unwrap_or_default() + 1);
        assert_eq!(map.get("a"), Some(2));
    }

    #[test]
    fn test_update_skips_missing_key() {
        let map = TopicMap::<u32>::new();
        assert!(!map.update("missing", |_| unreachable!()));
        map.upsert("a", |_| 5);
        assert!(map.update("a", |v| v * 2));
        assert_eq!(map.get("a"), Some(10));
    }

    #[test]
    fn test_remove_if_respects_predicate() {
        let map = TopicMap::<u32>::new();
        map.upsert("a", |_| 0);
        assert_eq!(map.remove_if("a", |v| *v > 0), None);
        assert_eq!(map.remove_if("a", |v| *v == 0), Some(0));
        assert_eq!(map.get("a"), None);
        assert_eq!(map.remove_if("a", |_| true), None);
    }

    #[test]
    fn test_drain_empties_and_returns_values() {
        let map = TopicMap::<u32>::new();
        for (i, k) in ["a", "b", "c"].iter().enumerate() {
            map.upsert(k, |_| i as u32);
        }
        let mut drained = map.drain();
        drained.sort_unstable();
        assert_eq!(drained, vec![0, 1, 2]);
        assert_eq!(map.len(), 0);
        assert!(map.snapshot().is_empty());
    }

    #[test]
    fn test_concurrent_upserts_are_not_lost() {
        let map = Arc::new(TopicMap::<u64>::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        map.upsert("hot", |old| old.copied().unwrap_or_default() + 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(map.get("hot"), Some(8000));
    }
}
