use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::{Condvar, Mutex};

/// Shared completion counter. Cloning is cheap and all clones observe the
/// same counts, so workers can report while another thread waits on it.
#[derive(Clone)]
pub struct Progress(Arc<ProgressInner>);

struct ProgressInner {
    complete: AtomicU64,
    total: AtomicU64,

    lock: Mutex<()>,
    notify: Condvar,
}

impl Progress {
    pub fn new() -> Self {
        Self(Arc::new(ProgressInner {
            complete: AtomicU64::new(0),
            total: AtomicU64::new(0),

            lock: Mutex::new(()),
            notify: Condvar::new(),
        }))
    }

    pub fn progress(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }

        self.completed() as f32 / total as f32
    }

    /// Returns true once the completed count reaches a non-zero total.
    pub fn complete(&self) -> bool {
        let total = self.total();
        total != 0 && self.completed() >= total
    }

    pub fn completed(&self) -> u64 {
        self.0.complete.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.0.total.load(Ordering::Relaxed)
    }

    pub fn set_total(&self, total: u64) {
        self.0.total.store(total, Ordering::Relaxed);
    }

    pub fn add_complete(&self, count: u64) {
        self.0.complete.fetch_add(count, Ordering::Relaxed);
        self.notify();
    }

    pub fn set_complete(&self, complete: u64) {
        self.0.complete.store(complete, Ordering::Relaxed);
        self.notify();
    }

    pub fn set_finished(&self) {
        self.0.complete.store(self.total(), Ordering::Relaxed);
        self.notify();
    }

    /// Blocks until the counter changes or the timeout elapses, returning
    /// the current completed count.
    pub fn wait(&self, timeout: Duration) -> u64 {
        let mut guard = self.0.lock.lock();
        if !self.complete() {
            self.0.notify.wait_for(&mut guard, timeout);
        }
        self.completed()
    }

    fn notify(&self) {
        let _guard = self.0.lock.lock();
        self.0.notify.notify_all();
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn counts_across_clones() {
        let progress = Progress::new();
        progress.set_total(4);

        let worker = progress.clone();
        thread::spawn(move || (0..4).for_each(|_| worker.add_complete(1)))
            .join()
            .unwrap();

        assert_eq!(progress.completed(), 4);
        assert!(progress.complete());
        assert_eq!(progress.wait(Duration::from_millis(1)), 4);
        assert!((progress.progress() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_total_is_never_complete() {
        let progress = Progress::new();
        assert!(!progress.complete());
        assert_eq!(progress.progress(), 0.0);
    }
}
