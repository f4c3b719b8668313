//! A counting semaphore built on a bounded channel pre-loaded with `n` tokens.
//! `acquire` blocks until a token is available; dropping the guard returns it.
//! Used for the Scanner's global concurrency limiter and the Windows rescan cap.

use crossbeam_channel::{Receiver, Sender, bounded};

pub struct Semaphore {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Semaphore {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        for _ in 0..capacity {
            let _ = tx.send(());
        }
        Self { tx, rx }
    }

    /// Blocks until a slot is free, then returns a guard that releases it on drop.
    pub fn acquire(&self) -> SemaphorePermit<'_> {
        self.rx.recv().expect("semaphore channel never closes");
        SemaphorePermit { tx: &self.tx }
    }
}

pub struct SemaphorePermit<'a> {
    tx: &'a Sender<()>,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        let _ = self.tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn bounds_concurrent_holders() {
        let sem = Arc::new(Semaphore::new(2));
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let sem = Arc::clone(&sem);
                let concurrent = Arc::clone(&concurrent);
                let max_seen = Arc::clone(&max_seen);
                scope.spawn(move || {
                    let _permit = sem.acquire();
                    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(5));
                    concurrent.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }
}
