//! Collections: named ordered maps from keys to value records.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{Generation, Key};
use crate::value::ValueRecord;

/// An ordered map from 64-bit keys to value records.
///
/// Entries are ordered by signed key comparison. Tombstoned entries stay in
/// the map (and in iteration order) so that concurrent transactions can
/// conflict against deletions; scan paths filter them out.
#[derive(Debug)]
pub struct Collection {
    name: String,
    entries: BTreeMap<Key, ValueRecord>,
    /// Number of entries whose head version is live. Eventually consistent
    /// when read without the database lock, exact under the write lock.
    live: AtomicU64,
}

impl Collection {
    /// Creates an empty collection. The main collection uses the empty name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
            live: AtomicU64::new(0),
        }
    }

    /// The collection's name; empty for the main collection.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is the main collection.
    #[must_use]
    pub fn is_main(&self) -> bool {
        self.name.is_empty()
    }

    /// Exact-match lookup, tombstones included.
    #[must_use]
    pub fn find(&self, key: Key) -> Option<&ValueRecord> {
        self.entries.get(&key)
    }

    /// Replaces or inserts the value for `key` at `generation`, clearing any
    /// tombstone. `pinned` lists live snapshot generations for version
    /// retention.
    pub fn upsert(
        &mut self,
        key: Key,
        payload: Vec<u8>,
        generation: Generation,
        pinned: &[Generation],
    ) {
        match self.entries.entry(key) {
            btree_map::Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                if !record.is_live() {
                    *self.live.get_mut() += 1;
                }
                record.upsert(payload, generation, pinned);
            }
            btree_map::Entry::Vacant(entry) => {
                entry.insert(ValueRecord::new_live(payload, generation));
                *self.live.get_mut() += 1;
            }
        }
    }

    /// Tombstones `key` at `generation`. A missing key is left untouched:
    /// there is no prior observation for a transaction to conflict with.
    pub fn tombstone(&mut self, key: Key, generation: Generation, pinned: &[Generation]) {
        if let Some(record) = self.entries.get_mut(&key) {
            if record.is_live() {
                *self.live.get_mut() -= 1;
            }
            record.tombstone(generation, pinned);
        }
    }

    /// In-order iteration starting at the first entry with key >= `start`,
    /// tombstones included.
    pub fn range_from(&self, start: Key) -> btree_map::Range<'_, Key, ValueRecord> {
        self.entries.range(start..)
    }

    /// In-order iteration over `[start, end)`, tombstones included.
    pub fn range(&self, start: Key, end: Key) -> btree_map::Range<'_, Key, ValueRecord> {
        if start > end {
            // An inverted range is empty; BTreeMap would panic on it.
            self.entries.range(start..start)
        } else {
            self.entries.range(start..end)
        }
    }

    /// Iterates every entry, tombstones included.
    pub fn entries(&self) -> btree_map::Iter<'_, Key, ValueRecord> {
        self.entries.iter()
    }

    /// Tombstones every entry at `generation`, preserving the key set.
    pub fn clear_values(&mut self, generation: Generation, pinned: &[Generation]) {
        for record in self.entries.values_mut() {
            record.tombstone(generation, pinned);
        }
        *self.live.get_mut() = 0;
    }

    /// Removes every entry, tombstones included.
    pub fn clear_all(&mut self) {
        self.entries.clear();
        *self.live.get_mut() = 0;
    }

    /// Drops version history no live snapshot can reach.
    pub fn compact(&mut self, pinned: &[Generation]) {
        for record in self.entries.values_mut() {
            record.prune(pinned);
        }
    }

    /// Number of live (non-tombstoned) entries.
    #[must_use]
    pub fn live_count(&self) -> u64 {
        self.live.load(Ordering::Relaxed)
    }

    /// Number of stored entries, tombstones included.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Total payload bytes across live head versions.
    #[must_use]
    pub fn live_bytes(&self) -> u64 {
        self.entries
            .values()
            .filter(|r| r.is_live())
            .map(|r| r.head().payload().len() as u64)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen(raw: u64) -> Generation {
        Generation::new(raw)
    }

    #[test]
    fn upsert_and_find() {
        let mut col = Collection::new("things");
        col.upsert(7, b"x".to_vec(), gen(1), &[]);
        assert_eq!(col.live_count(), 1);
        assert_eq!(col.find(7).unwrap().head().payload(), b"x");
        assert!(col.find(8).is_none());
    }

    #[test]
    fn tombstone_keeps_key_drops_live_count() {
        let mut col = Collection::new("things");
        col.upsert(7, b"x".to_vec(), gen(1), &[]);
        col.tombstone(7, gen(2), &[]);
        assert_eq!(col.live_count(), 0);
        assert_eq!(col.entry_count(), 1);
        assert!(!col.find(7).unwrap().is_live());
    }

    #[test]
    fn tombstone_of_missing_key_is_noop() {
        let mut col = Collection::new("things");
        col.tombstone(42, gen(1), &[]);
        assert_eq!(col.entry_count(), 0);
    }

    #[test]
    fn reinsert_after_tombstone_restores_live_count() {
        let mut col = Collection::new("things");
        col.upsert(7, b"x".to_vec(), gen(1), &[]);
        col.tombstone(7, gen(2), &[]);
        col.upsert(7, b"y".to_vec(), gen(3), &[]);
        assert_eq!(col.live_count(), 1);
        assert_eq!(col.find(7).unwrap().head().generation(), gen(3));
    }

    #[test]
    fn ranges_are_signed_ordered() {
        let mut col = Collection::new("");
        for key in [-2_i64, 0, 3, 9] {
            col.upsert(key, b"v".to_vec(), gen(1), &[]);
        }
        let keys: Vec<Key> = col.range_from(-1).map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![0, 3, 9]);
        let keys: Vec<Key> = col.range(0, 9).map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![0, 3]);
    }

    #[test]
    fn inverted_range_is_empty() {
        let mut col = Collection::new("");
        col.upsert(1, b"v".to_vec(), gen(1), &[]);
        assert_eq!(col.range(5, -5).count(), 0);
    }

    #[test]
    fn clear_values_tombstones_everything() {
        let mut col = Collection::new("things");
        col.upsert(1, b"a".to_vec(), gen(1), &[]);
        col.upsert(2, b"b".to_vec(), gen(1), &[]);
        col.clear_values(gen(2), &[]);
        assert_eq!(col.live_count(), 0);
        assert_eq!(col.entry_count(), 2);
        assert!(col.entries().all(|(_, r)| !r.is_live()));
    }

    #[test]
    fn clear_all_forgets_keys() {
        let mut col = Collection::new("things");
        col.upsert(1, b"a".to_vec(), gen(1), &[]);
        col.clear_all();
        assert_eq!(col.entry_count(), 0);
        assert_eq!(col.live_count(), 0);
    }

    #[test]
    fn live_bytes_counts_heads_only() {
        let mut col = Collection::new("");
        col.upsert(1, b"abc".to_vec(), gen(1), &[]);
        col.upsert(2, b"de".to_vec(), gen(2), &[]);
        col.tombstone(2, gen(3), &[]);
        assert_eq!(col.live_bytes(), 3);
    }
}
