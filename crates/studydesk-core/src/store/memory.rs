//! In-memory store adapter: the last-resort fallback and the test double
//! for simulating multiple UI contexts sharing one backing store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::StoreError;

use super::{Listener, StateStore};

#[derive(Default)]
struct Inner {
    map: Mutex<HashMap<String, String>>,
    listeners: Mutex<Vec<Listener>>,
}

/// Cloned handles share the same map and listener registry, so a write
/// through one handle notifies subscribers registered through another --
/// the same observable behavior the durable adapters give two processes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&self, key: &str, value: &str) {
        let listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(key, value);
        }
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.inner.map.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        {
            let mut map = self.inner.map.lock().unwrap_or_else(PoisonError::into_inner);
            map.insert(key.to_string(), value.to_string());
        }
        self.notify(key, value);
        Ok(())
    }

    fn subscribe(&self, listener: Listener) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
