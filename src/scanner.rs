//! Scanner (C7): recursive, bounded-parallelism directory walker. One global
//! semaphore gates all concurrently active scan tasks across every volume. A
//! permit is acquired before a child entry is processed and released before
//! recursing into it if it's a directory, so it is never held across the
//! recursive subtree walk — the same "acquire slot, detach, release before the
//! nested walk" shape as the source's goroutine fan-out.

use std::path::Path;
use std::sync::Arc;

use crate::attributes::AttributeProbe;
use crate::blacklist::Blacklist;
use crate::fsmeta::{build_error_record, build_record, unchanged};
use crate::hashing::hash_file;
use crate::semaphore::{Semaphore, SemaphorePermit};
use crate::store::IndexStore;

pub struct Scanner {
    store: Arc<IndexStore>,
    blacklist: Arc<Blacklist>,
    attribute_probe: Arc<dyn AttributeProbe>,
    limiter: Semaphore,
    hash_size_limit_bytes: u64,
}

impl Scanner {
    pub fn new(
        store: Arc<IndexStore>,
        blacklist: Arc<Blacklist>,
        attribute_probe: Arc<dyn AttributeProbe>,
        max_workers: usize,
        hash_size_limit_bytes: u64,
    ) -> Self {
        Self {
            store,
            blacklist,
            attribute_probe,
            limiter: Semaphore::new(max_workers),
            hash_size_limit_bytes,
        }
    }

    /// Walk `dir_path`, reconciling every reachable descendant with the Index
    /// store. Blocks until the whole subtree has been visited.
    pub fn enumerate(&self, dir_path: &Path) {
        let dir_str = dir_path.to_string_lossy().to_string();

        if self.blacklist.should_skip(&dir_str) {
            return;
        }
        if !self.store.try_enter_dir(&dir_str) {
            return;
        }
        let _guard = InFlightGuard {
            store: &self.store,
            dir: dir_str.clone(),
        };

        let read_dir = match std::fs::read_dir(dir_path) {
            Ok(rd) => rd,
            Err(e) => {
                self.handle_list_failure(dir_path, &dir_str, &e);
                return;
            }
        };

        std::thread::scope(|scope| {
            for entry in read_dir.flatten() {
                let child_path = entry.path();
                let permit = self.limiter.acquire();
                scope.spawn(move || {
                    self.process_child(&child_path, permit);
                });
            }
        });
    }

    fn handle_list_failure(&self, dir_path: &Path, dir_str: &str, error: &std::io::Error) {
        if error.kind() == std::io::ErrorKind::NotFound {
            log::debug!("directory vanished during scan: {dir_str}");
            return;
        }
        log::warn!("cannot list {dir_str}: {error}");
        let record = if std::fs::symlink_metadata(dir_path).is_ok() {
            build_error_record(dir_path, true, "not allowed to read")
        } else {
            build_error_record(dir_path, true, "no info available")
        };
        self.store.replace(dir_str.to_string(), record);
    }

    /// `permit` bounds how many of these run concurrently. It is dropped before
    /// recursing into a subdirectory — held only across this entry's own stat/hash
    /// work, never across the recursive subtree walk, or a directory with more
    /// children than permits would deadlock every permit against its own recursion.
    fn process_child(&self, child_path: &Path, permit: SemaphorePermit<'_>) {
        let meta = match std::fs::symlink_metadata(child_path) {
            Ok(m) => m,
            Err(_) => return, // vanished mid-walk: silently skip, error kind 2
        };
        let full_path = child_path.to_string_lossy().to_string();

        if meta.is_dir() {
            let attrs = self.attribute_probe.probe(child_path);
            let record = build_record(child_path, &meta, attrs, Default::default());
            self.store.put(full_path, record);
            drop(permit);
            self.enumerate(child_path);
            return;
        }

        match self.store.get(&full_path) {
            None => {
                let record = self.build_full_file_record(child_path, &meta);
                self.store.put(full_path, record);
            }
            Some(existing) if !existing.error.is_empty() => {}
            Some(existing) if unchanged(&existing, &meta) => {}
            Some(_) => {
                let record = self.build_full_file_record(child_path, &meta);
                self.store.replace(full_path, record);
            }
        }
    }

    fn build_full_file_record(&self, path: &Path, meta: &std::fs::Metadata) -> crate::record::Record {
        let attrs = self.attribute_probe.probe(path);
        if attrs.cloud_placeholder {
            return build_record(path, meta, attrs, Default::default());
        }
        match hash_file(path, meta.len(), self.hash_size_limit_bytes) {
            Ok(hash) => build_record(path, meta, attrs, hash),
            Err(e) => build_error_record(path, false, format!("hash failed: {e}")),
        }
    }
}

struct InFlightGuard<'a> {
    store: &'a IndexStore,
    dir: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.store.leave_dir(&self.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::NullAttributeProbe;
    use std::fs;

    fn scanner(store: Arc<IndexStore>) -> Scanner {
        scanner_with_workers(store, 5)
    }

    fn scanner_with_workers(store: Arc<IndexStore>, max_workers: usize) -> Scanner {
        Scanner::new(
            store,
            Arc::new(Blacklist::new(&[])),
            Arc::new(NullAttributeProbe),
            max_workers,
            crate::config::HASH_SIZE_LIMIT_BYTES,
        )
    }

    #[test]
    fn enumerate_indexes_files_and_subdirs() {
        let tmp = crate::testutil::scratch_dir();
        fs::write(tmp.path().join("a.txt"), b"hello").unwrap();
        fs::write(tmp.path().join("b.txt"), b"world").unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("c.txt"), b"!").unwrap();
        fs::write(sub.join("d.txt"), b"!!").unwrap();

        let store = Arc::new(IndexStore::new());
        scanner(Arc::clone(&store)).enumerate(tmp.path());

        // a.txt, b.txt, sub (top level) plus sub/c.txt, sub/d.txt from the recursive
        // call into sub = 5 entries (the walked root itself is never recorded).
        assert_eq!(store.len(), 5);
        assert!(store.in_flight_dirs_snapshot().is_empty());
    }

    #[test]
    fn rescan_skips_unchanged_and_refreshes_changed() {
        let tmp = crate::testutil::scratch_dir();
        let file = tmp.path().join("a.txt");
        fs::write(&file, b"hello").unwrap();

        let store = Arc::new(IndexStore::new());
        scanner(Arc::clone(&store)).enumerate(tmp.path());
        assert_eq!(store.pending_writes(), 1);

        scanner(Arc::clone(&store)).enumerate(tmp.path());
        assert_eq!(store.pending_writes(), 1, "unchanged file must not be re-put");

        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(&file, b"hello, world, now longer").unwrap();
        scanner(Arc::clone(&store)).enumerate(tmp.path());
        assert_eq!(store.pending_writes(), 2);
    }

    #[test]
    fn idempotent_on_unchanged_tree() {
        let tmp = crate::testutil::scratch_dir();
        fs::write(tmp.path().join("a.txt"), b"hello").unwrap();
        let store = Arc::new(IndexStore::new());
        scanner(Arc::clone(&store)).enumerate(tmp.path());
        let first: std::collections::BTreeMap<_, _> =
            store.full_paths().into_iter().map(|p| (p.clone(), store.get(&p).unwrap().hash)).collect();

        scanner(Arc::clone(&store)).enumerate(tmp.path());
        let second: std::collections::BTreeMap<_, _> =
            store.full_paths().into_iter().map(|p| (p.clone(), store.get(&p).unwrap().hash)).collect();

        assert_eq!(first, second);
    }

    /// A directory with more subdirectories than permits must not deadlock:
    /// each permit has to be released before its holder recurses, or every
    /// permit ends up blocked waiting on its own subtree.
    #[test]
    fn wide_tree_does_not_deadlock_a_small_permit_pool() {
        let tmp = crate::testutil::scratch_dir();
        for i in 0..8 {
            let sub = tmp.path().join(format!("sub{i}"));
            fs::create_dir(&sub).unwrap();
            fs::write(sub.join("leaf.txt"), b"leaf").unwrap();
        }

        let store = Arc::new(IndexStore::new());
        scanner_with_workers(Arc::clone(&store), 2).enumerate(tmp.path());

        // 8 subdirs + 8 leaf files.
        assert_eq!(store.len(), 16);
    }
}
