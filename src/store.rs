//! Index store (C6): the single source of truth. A sharded concurrent map keyed by
//! full path, plus the counters and sets the Scanner and Scheduler coordinate
//! through. No operation here holds a lock across I/O.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::record::Record;

/// Concurrent map of `full_path -> Record`, with the bookkeeping state described in
/// the data model: pending-write counter, persist/load timestamps, known volumes,
/// and the in-flight-directory reentrancy guard.
pub struct IndexStore {
    entries: DashMap<String, Record>,
    volumes: Mutex<Vec<String>>,
    in_flight_dirs: DashMap<String, ()>,
    pending_writes: AtomicU64,
    last_persist_ts: AtomicI64,
    last_load_ts: AtomicI64,
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            volumes: Mutex::new(Vec::new()),
            in_flight_dirs: DashMap::new(),
            pending_writes: AtomicU64::new(0),
            last_persist_ts: AtomicI64::new(0),
            last_load_ts: AtomicI64::new(0),
        }
    }

    /// Insert iff the key is absent; first-writer-wins. Returns whether the write
    /// took effect. On insert, increments `pending_writes`.
    pub fn put(&self, full_path: String, record: Record) -> bool {
        use dashmap::mapref::entry::Entry;
        match self.entries.entry(full_path) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                self.pending_writes.fetch_add(1, Ordering::Relaxed);
                true
            }
        }
    }

    /// Unconditional overwrite; always increments `pending_writes`.
    pub fn replace(&self, full_path: String, record: Record) {
        self.entries.insert(full_path, record);
        self.pending_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Insert a record coming from a snapshot load. Bypasses `pending_writes`:
    /// these entries are already durable, not pending persistence.
    pub fn insert_loaded(&self, full_path: String, record: Record) {
        self.entries.insert(full_path, record);
    }

    pub fn get(&self, full_path: &str) -> Option<Record> {
        self.entries.get(full_path).map(|r| r.value().clone())
    }

    pub fn contains(&self, full_path: &str) -> bool {
        self.entries.contains_key(full_path)
    }

    /// Removes iff present. Returns the removed record, if any.
    pub fn remove(&self, full_path: &str) -> Option<Record> {
        self.entries.remove(full_path).map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consistent per-entry snapshots, no global lock. `visitor` may observe an
    /// entry that is concurrently removed elsewhere; that is an accepted race.
    pub fn iterate(&self, mut visitor: impl FnMut(&str, &Record)) {
        for entry in self.entries.iter() {
            visitor(entry.key(), entry.value());
        }
    }

    /// Snapshot of every full path currently in the store, for removal detection
    /// and the search producer.
    pub fn full_paths(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn pending_writes(&self) -> u64 {
        self.pending_writes.load(Ordering::Relaxed)
    }

    /// Sets `last_persist_ts = now` and resets `pending_writes` to 0.
    pub fn mark_persisted(&self, now: DateTime<Utc>) {
        self.last_persist_ts.store(now.timestamp(), Ordering::Relaxed);
        self.pending_writes.store(0, Ordering::Relaxed);
    }

    pub fn last_persist_ts(&self) -> Option<DateTime<Utc>> {
        let ts = self.last_persist_ts.load(Ordering::Relaxed);
        (ts != 0).then(|| DateTime::from_timestamp(ts, 0).unwrap_or_default())
    }

    pub fn mark_loaded(&self, now: DateTime<Utc>) {
        self.last_load_ts.store(now.timestamp(), Ordering::Relaxed);
    }

    pub fn last_load_ts(&self) -> Option<DateTime<Utc>> {
        let ts = self.last_load_ts.load(Ordering::Relaxed);
        (ts != 0).then(|| DateTime::from_timestamp(ts, 0).unwrap_or_default())
    }

    // -- volumes --

    pub fn volumes(&self) -> Vec<String> {
        self.volumes.lock().unwrap().clone()
    }

    /// Adds `volume` if not already known. Returns true if it was newly added.
    pub fn add_volume(&self, volume: String) -> bool {
        let mut volumes = self.volumes.lock().unwrap();
        if volumes.iter().any(|v| v == &volume) {
            false
        } else {
            volumes.push(volume);
            true
        }
    }

    // -- in-flight directory reentrancy guard --

    /// Attempts to mark `dir` as in-flight. Returns false (do not enter) if it is
    /// already owned by another walker.
    pub fn try_enter_dir(&self, dir: &str) -> bool {
        use dashmap::mapref::entry::Entry;
        match self.in_flight_dirs.entry(dir.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(());
                true
            }
        }
    }

    pub fn leave_dir(&self, dir: &str) {
        self.in_flight_dirs.remove(dir);
    }

    pub fn in_flight_dirs_len(&self) -> usize {
        self.in_flight_dirs.len()
    }

    /// All full paths currently marked as a Scanner-owned directory (test/debug use).
    pub fn in_flight_dirs_snapshot(&self) -> HashSet<String> {
        self.in_flight_dirs.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{HashBundle, Permissions};

    fn sample_record(full_path: &str) -> Record {
        Record {
            name: full_path.rsplit('/').next().unwrap_or(full_path).to_string(),
            extension: String::new(),
            parent_path: String::new(),
            full_path: full_path.to_string(),
            size: 0,
            is_hidden: false,
            is_dir: false,
            is_cloud_placeholder: false,
            created_time: Utc::now(),
            mod_time: Utc::now(),
            accessed_time: Utc::now(),
            permissions: Permissions::default(),
            hash: HashBundle::default(),
            error: String::new(),
            attributes: Default::default(),
            transient: Default::default(),
        }
    }

    #[test]
    fn put_is_first_writer_wins() {
        let store = IndexStore::new();
        assert!(store.put("/a".into(), sample_record("/a")));
        assert!(!store.put("/a".into(), sample_record("/a")));
        assert_eq!(store.pending_writes(), 1);
    }

    #[test]
    fn replace_always_increments() {
        let store = IndexStore::new();
        store.replace("/a".into(), sample_record("/a"));
        store.replace("/a".into(), sample_record("/a"));
        assert_eq!(store.pending_writes(), 2);
    }

    #[test]
    fn mark_persisted_resets_counter() {
        let store = IndexStore::new();
        store.put("/a".into(), sample_record("/a"));
        store.put("/b".into(), sample_record("/b"));
        store.mark_persisted(Utc::now());
        assert_eq!(store.pending_writes(), 0);
    }

    #[test]
    fn reentrancy_guard_rejects_second_entrant() {
        let store = IndexStore::new();
        assert!(store.try_enter_dir("/root"));
        assert!(!store.try_enter_dir("/root"));
        store.leave_dir("/root");
        assert!(store.try_enter_dir("/root"));
    }

    #[test]
    fn keys_match_full_path() {
        let store = IndexStore::new();
        store.put("/a/b.txt".into(), sample_record("/a/b.txt"));
        store.iterate(|key, record| {
            assert_eq!(key, record.full_path);
        });
    }
}
