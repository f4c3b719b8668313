//! Search engine (C10): deadline-bounded, parallel scoring pipeline. Producer
//! feeds records into a bounded channel, W workers score them and forward
//! non-zero hits to a result channel, a collector keeps the running top-K.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};

use crate::heap::TopKHeap;
use crate::record::Record;
use crate::scoring::score_record;
use crate::store::IndexStore;

#[derive(Clone)]
struct Scored(i64, Record);

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for Scored {}
impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Scored {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// Run one search: score every record in `store` against `query`, returning up
/// to `max_results` hits sorted by descending score. Returns whatever was
/// collected if `deadline` elapses before the scan finishes; never errors.
pub fn search(store: &IndexStore, query: &str, deadline: Duration, workers: usize, max_results: usize) -> Vec<Record> {
    let started = Instant::now();
    let worker_count = workers.max(1);

    let (input_tx, input_rx): (Sender<Record>, Receiver<Record>) = bounded(worker_count);
    let (result_tx, result_rx): (Sender<Scored>, Receiver<Scored>) = bounded(worker_count);

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let input_rx = input_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for mut record in input_rx {
                    let (score, breakdown) = score_record(&record, query);
                    if score > 0 {
                        record.transient.score = score;
                        record.transient.score_data = Some(breakdown);
                        if result_tx.send(Scored(score, record)).is_err() {
                            break;
                        }
                    }
                }
            });
        }
        drop(result_tx);

        scope.spawn(|| {
            for full_path in store.full_paths() {
                if started.elapsed() >= deadline {
                    break;
                }
                let Some(record) = store.get(&full_path) else { continue };
                let remaining = deadline.saturating_sub(started.elapsed());
                if input_tx.send_timeout(record, remaining).is_err() {
                    break;
                }
            }
            drop(input_tx);
        });

        let mut heap = TopKHeap::new(max_results);
        loop {
            let remaining = deadline.saturating_sub(started.elapsed());
            match result_rx.recv_timeout(remaining) {
                Ok(scored) => heap.offer(scored),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        heap.into_sorted_desc().into_iter().map(|Scored(_, r)| r).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{HashBundle, Permissions};
    use chrono::Utc;

    fn file_record(name: &str) -> Record {
        Record {
            name: name.to_string(),
            extension: String::new(),
            parent_path: "/home/alice".to_string(),
            full_path: format!("/home/alice/{name}"),
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
    fn returns_matches_sorted_by_score() {
        let store = IndexStore::new();
        store.put("/home/alice/readme.md".into(), file_record("readme.md"));
        store.put("/home/alice/read.txt".into(), file_record("read.txt"));
        store.put("/home/alice/unrelated.bin".into(), file_record("unrelated.bin"));

        let results = search(&store, "read", Duration::from_secs(1), 4, 500);
        assert_eq!(results.len(), 2);
        assert!(results[0].transient.score >= results[1].transient.score);
    }

    #[test]
    fn respects_max_results_cap() {
        let store = IndexStore::new();
        for i in 0..20 {
            store.put(format!("/home/alice/match_{i}.txt"), file_record(&format!("match_{i}.txt")));
        }
        let results = search(&store, "match", Duration::from_secs(1), 4, 5);
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn empty_store_returns_no_results() {
        let store = IndexStore::new();
        let results = search(&store, "anything", Duration::from_millis(200), 4, 500);
        assert!(results.is_empty());
    }
}
