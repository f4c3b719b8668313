//! Maintenance scheduler (C9): four independent self-rescheduling periodic
//! tasks — snapshot persistence, volume rescans, removal detection, and (on
//! Windows) drive-letter discovery — plus the removal-detection worker pool
//! from §4.7.

use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;

use crate::blacklist::Blacklist;
use crate::scanner::Scanner;
#[cfg(windows)]
use crate::semaphore::Semaphore;
use crate::shutdown::ShutdownCoordinator;
use crate::snapshot;
use crate::store::IndexStore;

const SNAPSHOT_PERIOD: Duration = Duration::from_secs(10);
const SNAPSHOT_MIN_PENDING: u64 = 50;
const SNAPSHOT_MAX_AGE: Duration = Duration::from_secs(60);
const RESCAN_PERIOD: Duration = Duration::from_secs(30);
const GC_FIRST_FIRE: Duration = Duration::from_secs(30);
const GC_PERIOD: Duration = Duration::from_secs(5 * 60);
#[cfg(windows)]
const PROBE_PERIOD: Duration = Duration::from_secs(10);
#[cfg(windows)]
const WINDOWS_RESCAN_CAP: usize = crate::config::DEFAULT_WINDOWS_RESCAN_CAP;

/// Shared stop signal: a bool under a mutex plus a condvar, so `stop()` wakes
/// every sleeping task immediately instead of waiting out its own period.
type StopSignal = Arc<(Mutex<bool>, Condvar)>;

fn sleep_or_stop(signal: &StopSignal, duration: Duration) -> bool {
    let (lock, cvar) = &**signal;
    let guard = lock.lock().unwrap();
    let (guard, _) = cvar.wait_timeout(guard, duration).unwrap();
    *guard
}

pub struct Scheduler {
    store: Arc<IndexStore>,
    blacklist: Arc<Blacklist>,
    scanner: Arc<Scanner>,
    snapshot_path: PathBuf,
    shutdown: Arc<ShutdownCoordinator>,
    gc_workers: usize,
    stop: StopSignal,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<IndexStore>,
        blacklist: Arc<Blacklist>,
        scanner: Arc<Scanner>,
        snapshot_path: PathBuf,
        shutdown: Arc<ShutdownCoordinator>,
        gc_workers: usize,
    ) -> Self {
        Self {
            store,
            blacklist,
            scanner,
            snapshot_path,
            shutdown,
            gc_workers,
            stop: Arc::new((Mutex::new(false), Condvar::new())),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Start all four periodic tasks against `volumes` (the known roots at
    /// startup; PROBE-DRIVES appends to the Index store's own volume list).
    pub fn start(&self, volumes: Vec<String>) {
        for v in &volumes {
            self.store.add_volume(v.clone());
        }

        let mut handles = self.handles.lock().unwrap();
        handles.push(self.spawn_snapshot_task());
        handles.push(self.spawn_rescan_task());
        handles.push(self.spawn_gc_task());
        #[cfg(windows)]
        handles.push(self.spawn_probe_drives_task());
    }

    /// Signal every task to stop and join them. Does not itself force a final
    /// snapshot; callers that want one call `snapshot::store` directly first.
    pub fn stop(&self) {
        {
            let (lock, cvar) = &*self.stop;
            let mut stopped = lock.lock().unwrap();
            *stopped = true;
            cvar.notify_all();
        }
        let mut handles = self.handles.lock().unwrap();
        for h in handles.drain(..) {
            let _ = h.join();
        }
    }

    fn spawn_snapshot_task(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let path = self.snapshot_path.clone();
        let shutdown = Arc::clone(&self.shutdown);
        let stop = Arc::clone(&self.stop);
        std::thread::spawn(move || {
            while !sleep_or_stop(&stop, SNAPSHOT_PERIOD) {
                if should_snapshot(&store)
                    && let Err(e) = snapshot::store(&path, &store, &shutdown)
                {
                    log::warn!("snapshot persist failed: {e}");
                }
            }
        })
    }

    fn spawn_rescan_task(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let scanner = Arc::clone(&self.scanner);
        let stop = Arc::clone(&self.stop);
        std::thread::spawn(move || {
            #[cfg(windows)]
            let volume_limiter = Semaphore::new(WINDOWS_RESCAN_CAP);
            while !sleep_or_stop(&stop, RESCAN_PERIOD) {
                if store.last_load_ts().is_none() {
                    continue;
                }
                let volumes = store.volumes();
                std::thread::scope(|scope| {
                    for volume in &volumes {
                        let scanner = &scanner;
                        #[cfg(windows)]
                        let permit = volume_limiter.acquire();
                        scope.spawn(move || {
                            #[cfg(windows)]
                            let _permit = permit;
                            scanner.enumerate(std::path::Path::new(volume));
                        });
                    }
                });
            }
        })
    }

    fn spawn_gc_task(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let blacklist = Arc::clone(&self.blacklist);
        let gc_workers = self.gc_workers;
        let stop = Arc::clone(&self.stop);
        std::thread::spawn(move || {
            if sleep_or_stop(&stop, GC_FIRST_FIRE) {
                return;
            }
            loop {
                gc_removed(&store, &blacklist, gc_workers);
                if sleep_or_stop(&stop, GC_PERIOD) {
                    return;
                }
            }
        })
    }

    #[cfg(windows)]
    fn spawn_probe_drives_task(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let stop = Arc::clone(&self.stop);
        std::thread::spawn(move || {
            while !sleep_or_stop(&stop, PROBE_PERIOD) {
                probe_drives(&store);
            }
        })
    }
}

fn should_snapshot(store: &IndexStore) -> bool {
    let pending = store.pending_writes();
    if pending == 0 {
        return false;
    }
    if pending >= SNAPSHOT_MIN_PENDING {
        return true;
    }
    match store.last_persist_ts() {
        None => true,
        Some(last) => (Utc::now() - last).to_std().unwrap_or_default() >= SNAPSHOT_MAX_AGE,
    }
}

/// §4.7: a fixed worker pool stats every known path; not-found or blacklisted
/// paths are collected, then deleted from the store in a second phase so
/// nothing mutates the map while a scan is iterating it.
fn gc_removed(store: &IndexStore, blacklist: &Blacklist, workers: usize) {
    let (path_tx, path_rx) = crossbeam_channel::unbounded::<String>();
    for path in store.full_paths() {
        let _ = path_tx.send(path);
    }
    drop(path_tx);

    let (dead_tx, dead_rx) = crossbeam_channel::unbounded::<String>();
    std::thread::scope(|scope| {
        for _ in 0..workers.max(1) {
            let path_rx = path_rx.clone();
            let dead_tx = dead_tx.clone();
            scope.spawn(move || {
                for path in path_rx {
                    let gone = std::fs::symlink_metadata(&path).is_err();
                    if gone || blacklist.should_skip(&path) {
                        let _ = dead_tx.send(path);
                    }
                }
            });
        }
        drop(dead_tx);

        let dead: Vec<String> = dead_rx.iter().collect();
        for path in dead {
            store.remove(&path);
        }
    });
}

#[cfg(windows)]
fn probe_drives(store: &IndexStore) {
    for letter in b'A'..=b'Z' {
        let root = format!("{}:/", letter as char);
        if store.volumes().iter().any(|v| v == &root) {
            continue;
        }
        if std::path::Path::new(&root).exists() {
            store.add_volume(root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{HashBundle, Permissions, Record};
    use std::fs;

    fn sample(full_path: &str) -> Record {
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
    fn gc_removes_vanished_and_blacklisted_entries() {
        let tmp = crate::testutil::scratch_dir();
        let keep = tmp.path().join("keep.txt");
        fs::write(&keep, b"x").unwrap();

        let store = IndexStore::new();
        store.put(keep.to_string_lossy().to_string(), sample(&keep.to_string_lossy()));
        store.put("/definitely/gone.txt".into(), sample("/definitely/gone.txt"));

        let blacklist = Blacklist::new(&[]);
        gc_removed(&store, &blacklist, 4);

        assert_eq!(store.len(), 1);
        assert!(store.contains(keep.to_string_lossy().as_ref()));
    }

    #[test]
    fn should_snapshot_respects_thresholds() {
        let store = IndexStore::new();
        assert!(!should_snapshot(&store));
        store.put("/a".into(), sample("/a"));
        assert!(should_snapshot(&store), "first write with no prior persist should fire");
        store.mark_persisted(Utc::now());
        assert!(!should_snapshot(&store));
    }
}
