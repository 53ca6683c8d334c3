//! Per-key async locks so identical cache misses make one upstream call.
//!
//! The first caller for a key holds its lock while the analysis runs; later
//! callers for the same key wait, then re-check the cache. Each slot counts
//! its holder and waiters and is removed when that count reaches zero,
//! including when a waiter is cancelled before it gets the lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// Holder plus waiters.
    users: usize,
}

/// Registry of in-flight keys.
#[derive(Debug, Default)]
pub struct SingleFlight {
    slots: Mutex<HashMap<String, Slot>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until this caller is the only one working on `key`.
    pub async fn acquire(&self, key: &str) -> FlightGuard<'_> {
        let lock = {
            let mut slots = self.lock();
            let slot = slots.entry(key.to_string()).or_default();
            slot.users += 1;
            Arc::clone(&slot.lock)
        };
        // Registered before waiting: dropping this future mid-wait drops the
        // guard, which gives the slot back.
        let mut guard = FlightGuard {
            owner: self,
            key: key.to_string(),
            permit: None,
        };
        guard.permit = Some(lock.lock_owned().await);
        guard
    }

    /// Number of keys with a holder or waiters.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().expect("single-flight lock poisoned")
    }
}

/// Held while the owning caller works on (or waits for) a key. Releases on
/// drop.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    owner: &'a SingleFlight,
    key: String,
    permit: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        drop(self.permit.take());
        let mut slots = self.owner.lock();
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.users = slot.users.saturating_sub(1);
            if slot.users == 0 {
                slots.remove(&self.key);
            }
        }
    }
}
