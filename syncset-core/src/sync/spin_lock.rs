use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::utils::Backoff;

use super::RawLock;

/// Compare-and-swap spin lock.
///
/// Waiters spin on a plain load (test-and-test-and-set) with exponential
/// backoff, so the cache line is only written when the lock looks free.
///
#[derive(Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

impl SpinLock {
    pub const fn new() -> Self {
        SpinLock {
            locked: AtomicBool::new(false),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

unsafe impl RawLock for SpinLock {
    fn acquire(&self) {
        let backoff = Backoff::new();
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                backoff.snooze();
            }
        }
    }

    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn release(&self) {
        self.locked.store(false, Ordering::Release);
    }
}
