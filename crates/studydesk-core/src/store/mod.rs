//! Shared persisted state store.
//!
//! The one synchronization primitive every context relies on: a key/value
//! store with change notification, composed from an ordered list of
//! adapters. The first adapter that successfully serves an operation wins;
//! a failing adapter logs a warning and the next one is tried, so the timer
//! authority never needs to know which backing store answered.
//!
//! Adapters, in default priority order:
//! - [`SqliteStore`] -- the durable, host-wide store shared across processes
//! - [`JsonFileStore`] -- one JSON file per key under the data dir
//! - [`MemoryStore`] -- in-memory last resort, also the test double

mod file;
mod memory;
mod sqlite;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::StoreError;

/// Change listener: `(key, new_value)`, invoked after every accepted write
/// to the backing resource, including writes from other handles.
pub type Listener = Arc<dyn Fn(&str, &str) + Send + Sync>;

pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn subscribe(&self, listener: Listener);
    /// Adapter name for log lines.
    fn name(&self) -> &'static str;
}

/// Returns `~/.config/studydesk[-dev]/` based on STUDYDESK_ENV.
///
/// Set STUDYDESK_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STUDYDESK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("studydesk-dev")
    } else {
        base_dir.join("studydesk")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Ordered composition of adapters behind a single [`StateStore`] face.
pub struct FallbackStore {
    adapters: Vec<Arc<dyn StateStore>>,
}

impl FallbackStore {
    pub fn new(adapters: Vec<Arc<dyn StateStore>>) -> Self {
        Self { adapters }
    }

    /// Build the default chain: SQLite, then JSON files, then memory.
    /// Adapters that fail to open are skipped with a warning.
    pub fn open_default() -> Self {
        let mut adapters: Vec<Arc<dyn StateStore>> = Vec::new();
        match data_dir() {
            Ok(dir) => {
                match SqliteStore::open(dir.join("studydesk.db")) {
                    Ok(store) => adapters.push(Arc::new(store)),
                    Err(err) => tracing::warn!(%err, "sqlite store unavailable"),
                }
                match JsonFileStore::open(dir.join("state")) {
                    Ok(store) => adapters.push(Arc::new(store)),
                    Err(err) => tracing::warn!(%err, "file store unavailable"),
                }
            }
            Err(err) => tracing::warn!(%err, "data dir unavailable"),
        }
        adapters.push(Arc::new(MemoryStore::new()));
        Self::new(adapters)
    }

    pub fn adapters(&self) -> &[Arc<dyn StateStore>] {
        &self.adapters
    }
}

impl StateStore for FallbackStore {
    /// Reads take the first adapter that returns a value; a `None` from a
    /// preferred adapter falls through so a degraded-period write in a
    /// fallback adapter is still found.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut all_failed = true;
        for adapter in &self.adapters {
            match adapter.get(key) {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => all_failed = false,
                Err(err) => {
                    tracing::warn!(adapter = adapter.name(), key, %err, "store read failed, trying next adapter");
                }
            }
        }
        if all_failed && !self.adapters.is_empty() {
            return Err(StoreError::Exhausted { key: key.to_string() });
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        for adapter in &self.adapters {
            match adapter.set(key, value) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    tracing::warn!(adapter = adapter.name(), key, %err, "store write failed, trying next adapter");
                }
            }
        }
        Err(StoreError::Exhausted { key: key.to_string() })
    }

    /// Listeners are registered with every adapter, so whichever one ends up
    /// serving a write still notifies.
    fn subscribe(&self, listener: Listener) {
        for adapter in &self.adapters {
            adapter.subscribe(listener.clone());
        }
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Adapter that always fails, for exercising the fallback chain.
    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::ReadFailed {
                key: key.to_string(),
                message: "backing store offline".into(),
            })
        }
        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            let _ = value;
            Err(StoreError::WriteFailed {
                key: key.to_string(),
                message: "backing store offline".into(),
            })
        }
        fn subscribe(&self, _listener: Listener) {}
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn write_falls_through_broken_adapter() {
        let memory = MemoryStore::new();
        let store = FallbackStore::new(vec![Arc::new(BrokenStore), Arc::new(memory.clone())]);
        store.set("k", "v").unwrap();
        assert_eq!(memory.get("k").unwrap(), Some("v".to_string()));
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn read_prefers_first_adapter_with_value() {
        let first = MemoryStore::new();
        let second = MemoryStore::new();
        first.set("k", "first").unwrap();
        second.set("k", "second").unwrap();
        let store = FallbackStore::new(vec![Arc::new(first), Arc::new(second)]);
        assert_eq!(store.get("k").unwrap(), Some("first".to_string()));
    }

    #[test]
    fn all_adapters_failing_is_an_error() {
        let store = FallbackStore::new(vec![Arc::new(BrokenStore)]);
        assert!(matches!(store.set("k", "v"), Err(StoreError::Exhausted { .. })));
        assert!(matches!(store.get("k"), Err(StoreError::Exhausted { .. })));
    }

    #[test]
    fn subscribe_reaches_the_serving_adapter() {
        let memory = MemoryStore::new();
        let store = FallbackStore::new(vec![Arc::new(BrokenStore), Arc::new(memory)]);
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(Arc::new(move |key, value| {
            sink.lock().unwrap().push((key.to_string(), value.to_string()));
        }));
        store.set("timer.state", "{}").unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[("timer.state".to_string(), "{}".to_string())]);
    }
}
