//! Per-interface exclusion locks.
//!
//! At most one apply or restore may hold a given interface name at a time.
//! Acquisition never waits: a second caller gets `None` and reports a
//! concurrency conflict. Unrelated names never contend.
//!
//! # Example
//!
//! ```rust
//! use macaron_core::lock::InterfaceLocks;
//!
//! let locks = InterfaceLocks::new();
//! let guard = locks.try_acquire("eth0").expect("free");
//! assert!(locks.try_acquire("eth0").is_none());
//! assert!(locks.try_acquire("wlan0").is_some());
//! drop(guard);
//! assert!(locks.try_acquire("eth0").is_some());
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// RAII guard that releases the interface name when dropped.
#[derive(Debug)]
pub struct InterfaceGuard {
    locks: Arc<LocksInner>,
    name: String,
}

impl InterfaceGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for InterfaceGuard {
    fn drop(&mut self) {
        self.locks.held().remove(&self.name);
    }
}

#[derive(Debug, Default)]
struct LocksInner {
    held: Mutex<HashSet<String>>,
}

impl LocksInner {
    // A poisoned set is still a valid set of names.
    fn held(&self) -> MutexGuard<'_, HashSet<String>> {
        self.held.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Set of interface names with an operation in flight.
#[derive(Debug, Clone, Default)]
pub struct InterfaceLocks {
    inner: Arc<LocksInner>,
}

impl InterfaceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`. Returns `None` if it is already held.
    pub fn try_acquire(&self, name: &str) -> Option<InterfaceGuard> {
        let mut held = self.inner.held();
        if !held.insert(name.to_string()) {
            return None;
        }
        Some(InterfaceGuard {
            locks: Arc::clone(&self.inner),
            name: name.to_string(),
        })
    }

    pub fn is_locked(&self, name: &str) -> bool {
        self.inner.held().contains(name)
    }

    /// Number of names currently held.
    pub fn held_count(&self) -> usize {
        self.inner.held().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_second_acquire_fails() {
        let locks = InterfaceLocks::new();
        let _guard = locks.try_acquire("eth0").unwrap();
        assert!(locks.try_acquire("eth0").is_none());
        assert!(locks.is_locked("eth0"));
    }

    #[test]
    fn test_drop_releases() {
        let locks = InterfaceLocks::new();
        {
            let guard = locks.try_acquire("eth0").unwrap();
            assert_eq!(guard.name(), "eth0");
            assert_eq!(locks.held_count(), 1);
        }
        assert_eq!(locks.held_count(), 0);
        assert!(locks.try_acquire("eth0").is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let locks = InterfaceLocks::new();
        let other = locks.clone();
        let _guard = locks.try_acquire("wlan0").unwrap();
        assert!(other.try_acquire("wlan0").is_none());
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        let locks = InterfaceLocks::new();
        let wins = Arc::new(AtomicUsize::new(0));
        let start = Arc::new(std::sync::Barrier::new(8));
        let attempted = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let wins = Arc::clone(&wins);
                let start = Arc::clone(&start);
                let attempted = Arc::clone(&attempted);
                thread::spawn(move || {
                    start.wait();
                    let guard = locks.try_acquire("eth0");
                    if guard.is_some() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                    // Hold until every thread has tried
                    attempted.wait();
                    drop(guard);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
