//! Pluggable counter store behind the quota accounting.
//!
//! The quota manager's counters go through [`CounterStore`] so that a shared
//! backend (e.g. a distributed counter service) can replace the in-process
//! map without touching business logic. The default [`MemoryStore`] keeps
//! everything in a mutex-guarded map. Increments are atomic per store call,
//! but cross-process coordination still needs a backend with an atomic
//! increment-and-compare primitive.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Key-value counter storage with optional per-key expiry.
pub trait CounterStore: Send + Sync {
    /// Read a counter. Expired keys read as `None`.
    fn get(&self, key: &str) -> Option<u64>;

    /// Write a counter, replacing any previous value and expiry.
    fn set(&self, key: &str, value: u64, ttl: Option<Duration>);

    /// Add `by` to a counter (creating it at zero) and return the new value.
    /// A key created or revived after expiry by this call takes `ttl` as
    /// its expiry; an existing live key keeps its original expiry.
    fn increment(&self, key: &str, by: u64, ttl: Option<Duration>) -> u64;

    /// Remove a counter.
    fn delete(&self, key: &str);

    /// Drop expired entries, returning how many were removed. Backends with
    /// native expiry can keep the default no-op.
    fn sweep(&self) -> usize {
        0
    }
}

struct StoredValue {
    value: u64,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|t| Instant::now() > t)
    }
}

/// In-process [`CounterStore`] backed by a mutex-guarded map.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredValue>> {
        // A poisoned lock still holds valid counter data; recover rather
        // than propagate so the safety layer degrades open.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CounterStore for MemoryStore {
    fn get(&self, key: &str) -> Option<u64> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(stored) if stored.expired() => {
                entries.remove(key);
                None
            }
            Some(stored) => Some(stored.value),
            None => None,
        }
    }

    fn set(&self, key: &str, value: u64, ttl: Option<Duration>) {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.lock()
            .insert(key.to_string(), StoredValue { value, expires_at });
    }

    fn increment(&self, key: &str, by: u64, ttl: Option<Duration>) -> u64 {
        let now = Instant::now();
        let mut entries = self.lock();
        let stored = entries.entry(key.to_string()).or_insert(StoredValue {
            value: 0,
            expires_at: ttl.map(|d| now + d),
        });
        if stored.expired() {
            stored.value = 0;
            stored.expires_at = ttl.map(|d| now + d);
        }
        stored.value += by;
        stored.value
    }

    fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    fn sweep(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, stored| !stored.expired());
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "counter store sweep removed expired keys");
        }
        removed
    }
}
