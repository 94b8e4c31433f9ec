//! In-memory, write-once key/value store whose entries expire after a fixed TTL.
//!
//! Every insert schedules its own removal on the tokio runtime. Reads also treat
//! elapsed entries as absent, so a registry used outside a runtime (or one whose
//! removal task has not run yet) never returns stale data.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("an entry with this key is already registered")]
pub struct DuplicateKey;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Insertion order. With a fixed TTL this is also expiry order.
    order: VecDeque<K>,
}

impl<K: Eq + Hash, V> Inner<K, V> {
    fn purge_expired(&mut self, now: Instant) {
        while let Some(front) = self.order.front() {
            match self.entries.get(front) {
                Some(entry) if entry.expires_at > now => break,
                _ => {
                    if let Some(key) = self.order.pop_front() {
                        self.entries.remove(&key);
                    }
                }
            }
        }
    }

    fn remove_if_expired(&mut self, key: &K, expires_at: Instant) {
        let matches = self
            .entries
            .get(key)
            .map(|e| e.expires_at == expires_at)
            .unwrap_or(false);
        if matches {
            self.entries.remove(key);
            self.order.retain(|k| k != key);
        }
    }
}

pub struct TtlRegistry<K, V> {
    inner: Arc<Mutex<Inner<K, V>>>,
    ttl: Duration,
}

impl<K, V> Clone for TtlRegistry<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            ttl: self.ttl,
        }
    }
}

impl<K, V> TtlRegistry<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            })),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `value` under `key`. Entries are write-once: a live entry with the
    /// same key is never replaced.
    pub fn insert(&self, key: K, value: V) -> Result<(), DuplicateKey> {
        let now = Instant::now();
        let expires_at = now + self.ttl;
        {
            let mut inner = self.lock();
            inner.purge_expired(now);
            if inner.entries.contains_key(&key) {
                return Err(DuplicateKey);
            }
            inner.entries.insert(key.clone(), Entry { value, expires_at });
            inner.order.push_back(key.clone());
        }
        self.schedule_removal(key, expires_at);
        Ok(())
    }

    fn schedule_removal(&self, key: K, expires_at: Instant) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No tokio runtime; registry entry will expire lazily");
            return;
        };
        let inner = Arc::downgrade(&self.inner);
        handle.spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            if let Some(inner) = inner.upgrade() {
                let mut guard = inner.lock().unwrap_or_else(|p| p.into_inner());
                guard.remove_if_expired(&key, expires_at);
            }
        });
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let inner = self.lock();
        inner
            .entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        let mut inner = self.lock();
        inner.purge_expired(Instant::now());
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live keys, oldest insert first.
    pub fn keys(&self) -> Vec<K> {
        let mut inner = self.lock();
        inner.purge_expired(Instant::now());
        inner
            .order
            .iter()
            .filter(|k| inner.entries.contains_key(*k))
            .cloned()
            .collect()
    }

    #[cfg(test)]
    fn stored_entries(&self) -> usize {
        self.lock().entries.len()
    }
}
