//! Per-(product, warehouse) mutual exclusion.
//!
//! A unit of work names every key it will touch up front and acquires them
//! all at once: the caller waits until none of its keys is held by anyone,
//! then takes the whole set in one step. No thread ever holds some keys while
//! waiting for others, so multi-key units (transfers, multi-line documents)
//! cannot deadlock. Units with disjoint key sets never wait on each other.

use std::collections::{BTreeSet, HashSet};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use stockmaster_inventory::BalanceKey;

#[derive(Debug, Default)]
pub struct KeyLocks {
    held: Mutex<HashSet<BalanceKey>>,
    released: Condvar,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every key is free, then hold them all.
    pub fn acquire(&self, keys: impl IntoIterator<Item = BalanceKey>) -> KeyGuard<'_> {
        let keys: BTreeSet<BalanceKey> = keys.into_iter().collect();

        let mut held = self.held.lock();
        while keys.iter().any(|k| held.contains(k)) {
            self.released.wait(&mut held);
        }
        held.extend(keys.iter().copied());
        drop(held);

        debug!(keys = keys.len(), "stock keys acquired");
        KeyGuard { locks: self, keys }
    }

    /// Number of keys currently held by all guards.
    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }
}

/// Exclusive hold on a set of keys; released on drop.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    keys: BTreeSet<BalanceKey>,
}

impl KeyGuard<'_> {
    pub fn covers(&self, key: &BalanceKey) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &BalanceKey> {
        self.keys.iter()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        let mut held = self.locks.held.lock();
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use stockmaster_inventory::{ProductId, WarehouseId};

    fn key() -> BalanceKey {
        BalanceKey::new(ProductId::generate(), WarehouseId::generate())
    }

    #[test]
    fn guard_releases_on_drop() {
        let locks = KeyLocks::new();
        let k = key();
        {
            let guard = locks.acquire([k, k]);
            assert!(guard.covers(&k));
            assert_eq!(locks.held_count(), 1);
        }
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn disjoint_keys_do_not_wait() {
        let locks = KeyLocks::new();
        let _a = locks.acquire([key()]);
        // Would block forever if disjoint keys contended.
        let _b = locks.acquire([key()]);
        assert_eq!(locks.held_count(), 2);
    }

    #[test]
    fn overlapping_sets_wait_for_release() {
        let locks = Arc::new(KeyLocks::new());
        let shared = key();
        let first = locks.acquire([shared, key()]);
        let acquired = Arc::new(AtomicBool::new(false));

        let handle = {
            let locks = Arc::clone(&locks);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                let _second = locks.acquire([key(), shared]);
                acquired.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));
        drop(first);
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert_eq!(locks.held_count(), 0);
    }
}
