//! External cache store interface.
//!
//! The engine's single-flight cache can write results through to a shared
//! store (Redis, memcached, a sidecar) so other processes reuse them. Only the
//! narrow `put`/`get` contract lives here; `MemoryStore` backs tests and
//! single-process deployments.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode cached value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Key/value store with per-entry expiry.
///
/// Values are JSON so any backend that stores strings can implement this.
pub trait CacheStore: Send + Sync {
    fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), StoreError>;

    /// `Ok(None)` for a missing or expired key.
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
}

struct StoredValue {
    value: Value,
    expires_at: Instant,
}

/// In-process `CacheStore`. Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredValue>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CacheStore for MemoryStore {
    fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), StoreError> {
        self.lock().insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(stored) if stored.expires_at > Instant::now() => Ok(Some(stored.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_then_get() {
        let store = MemoryStore::new();
        store
            .put("a", json!({"var_95": 0.02}), Duration::from_secs(60))
            .unwrap();
        assert_eq!(store.get("a").unwrap(), Some(json!({"var_95": 0.02})));
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.keys(), vec!["a".to_string()]);
    }

    #[test]
    fn expired_entries_are_dropped() {
        let store = MemoryStore::new();
        store.put("a", json!(1), Duration::ZERO).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn put_replaces() {
        let store = MemoryStore::new();
        store.put("a", json!(1), Duration::from_secs(60)).unwrap();
        store.put("a", json!(2), Duration::from_secs(60)).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(json!(2)));
        assert_eq!(store.len(), 1);
    }
}
