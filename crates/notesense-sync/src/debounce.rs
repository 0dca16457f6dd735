//! Keyed debounce timers.
//!
//! [`Debouncer::schedule`] starts a timer for a key; scheduling the same key
//! again before it fires aborts the previous timer, so only the latest job
//! runs. Jobs whose timer already fired are never aborted.
//!
//! Timers are tokio tasks: scheduling needs a running runtime, and paused
//! test time (`start_paused = true`) drives them deterministically.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

struct Slot {
    generation: u64,
    handle: JoinHandle<()>,
}

type Slots<K> = Arc<Mutex<HashMap<K, Slot>>>;

/// At most one pending timer per key.
pub struct Debouncer<K> {
    slots: Slots<K>,
    generation: AtomicU64,
}

impl<K> Default for Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Run `job` once `delay` passes without another `schedule` for `key`.
    ///
    /// Returns `true` if a pending timer for `key` was replaced.
    pub fn schedule<F, Fut>(&self, key: K, delay: Duration, job: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let slots = Arc::clone(&self.slots);
        let task_key = key.clone();

        // Held across spawn + insert so the timer cannot claim its slot
        // before the slot exists.
        let mut guard = lock(&self.slots);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slots = lock(&slots);
                match slots.get(&task_key) {
                    Some(slot) if slot.generation == generation => {
                        slots.remove(&task_key);
                    }
                    _ => return,
                }
            }
            job().await;
        });

        match guard.insert(key, Slot { generation, handle }) {
            Some(previous) => {
                previous.handle.abort();
                trace!("Debounce timer reset");
                true
            }
            None => false,
        }
    }

    /// Cancel the pending timer for `key`. Returns whether one existed.
    pub fn cancel(&self, key: &K) -> bool {
        match lock(&self.slots).remove(key) {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer whose key matches `predicate`.
    pub fn cancel_where(&self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let mut slots = lock(&self.slots);
        let keys: Vec<K> = slots.keys().filter(|k| predicate(k)).cloned().collect();
        for key in &keys {
            if let Some(slot) = slots.remove(key) {
                slot.handle.abort();
            }
        }
        keys.len()
    }

    /// Cancel everything. Returns how many timers were pending.
    pub fn cancel_all(&self) -> usize {
        let mut slots = lock(&self.slots);
        let count = slots.len();
        for (_, slot) in slots.drain() {
            slot.handle.abort();
        }
        count
    }

    pub fn is_pending(&self, key: &K) -> bool {
        lock(&self.slots).contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.slots).len()
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, slot) in slots.drain() {
            slot.handle.abort();
        }
    }
}

fn lock<K>(slots: &Mutex<HashMap<K, Slot>>) -> MutexGuard<'_, HashMap<K, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}
