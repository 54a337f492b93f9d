//! Blocking Counting Semaphore
//!
//! Backs both signalling paths of the FIFO: the space-available count the
//! producer blocks on, and the reader-notify wake-up the consumer waits on.

use std::sync::{Condvar, Mutex};

/// Counting semaphore with blocking multi-permit acquire
pub struct Semaphore {
    permits: Mutex<u64>,
    available: Condvar,
}

impl Semaphore {
    /// Create a semaphore holding `initial` permits
    pub fn new(initial: u64) -> Self {
        Self {
            permits: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    /// Block until `n` permits are available, then take all of them
    pub fn acquire(&self, n: u64) {
        // A poisoned count is still a valid count.
        let mut permits = self.permits.lock().unwrap_or_else(|e| e.into_inner());
        while *permits < n {
            permits = self
                .available
                .wait(permits)
                .unwrap_or_else(|e| e.into_inner());
        }
        *permits -= n;
    }

    /// Return `n` permits and wake any blocked waiter
    pub fn release(&self, n: u64) {
        let mut permits = self.permits.lock().unwrap_or_else(|e| e.into_inner());
        *permits += n;
        drop(permits);
        self.available.notify_all();
    }

    /// Current permit count (racy; introspection and tests only)
    pub fn permits(&self) -> u64 {
        *self.permits.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_acquire_release_counts() {
        let sem = Semaphore::new(5);
        sem.acquire(3);
        assert_eq!(sem.permits(), 2);
        sem.release(4);
        assert_eq!(sem.permits(), 6);
    }

    #[test]
    fn test_acquire_blocks_until_release() {
        let sem = Arc::new(Semaphore::new(0));
        let waker = Arc::clone(&sem);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            waker.release(2);
        });

        // Blocks until the other thread posts both permits.
        sem.acquire(2);
        assert_eq!(sem.permits(), 0);
        handle.join().unwrap();
    }
}
