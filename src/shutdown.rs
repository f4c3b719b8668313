//! Shutdown coordinator (C11): a task counter persistence holds around each
//! encode-and-rename so a host-level signal handler can wait for any in-flight
//! snapshot write to finish before the process exits. A plain injectable handle
//! rather than the source's process-wide singleton, so tests can hold their own.

use std::sync::{Condvar, Mutex};

#[derive(Default)]
pub struct ShutdownCoordinator {
    inner: Mutex<u64>,
    idle: Condvar,
}

/// RAII guard for one in-flight task; dropping it calls `done_task`.
pub struct TaskGuard<'a> {
    coordinator: &'a ShutdownCoordinator,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.done_task();
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one in-flight task. Returns a guard; dropping it (even on panic
    /// unwind) calls `done_task`, so callers need not remember to on error paths.
    pub fn add_task(&self) -> TaskGuard<'_> {
        let mut count = self.inner.lock().unwrap();
        *count += 1;
        TaskGuard { coordinator: self }
    }

    fn done_task(&self) {
        let mut count = self.inner.lock().unwrap();
        *count -= 1;
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    /// Blocks until no tasks are in flight.
    pub fn wait(&self) {
        let mut count = self.inner.lock().unwrap();
        while *count > 0 {
            count = self.idle.wait(count).unwrap();
        }
    }

    pub fn pending(&self) -> u64 {
        *self.inner.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn wait_returns_immediately_with_no_tasks() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.wait();
    }

    #[test]
    fn wait_blocks_until_guard_drops() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let guard = coordinator.add_task();
        let done = Arc::new(AtomicBool::new(false));

        std::thread::scope(|scope| {
            let coordinator = Arc::clone(&coordinator);
            let done_in_thread = Arc::clone(&done);
            scope.spawn(move || {
                coordinator.wait();
                assert!(done_in_thread.load(Ordering::SeqCst));
            });
            std::thread::sleep(std::time::Duration::from_millis(20));
            done.store(true, Ordering::SeqCst);
            drop(guard);
        });
    }
}
