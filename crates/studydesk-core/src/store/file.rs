//! JSON-file store adapter: one file per key under the data directory.
//!
//! The local fallback when the SQLite store is unavailable. Writes go
//! through a temp file + rename so a crash mid-write never leaves a
//! half-serialized state blob.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::StoreError;

use super::{Listener, StateStore};

#[derive(Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl JsonFileStore {
    /// Open (and create) the backing directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|err| StoreError::OpenFailed {
            path: dir.clone(),
            message: err.to_string(),
        })?;
        Ok(Self {
            dir,
            listeners: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are dotted identifiers; anything else is flattened defensively.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    fn notify(&self, key: &str, value: &str) {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(key, value);
        }
    }
}

fn write_atomic(path: &Path, value: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, value)?;
    std::fs::rename(&tmp, path)
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::ReadFailed {
                key: key.to_string(),
                message: err.to_string(),
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        write_atomic(&self.path_for(key), value).map_err(|err| StoreError::WriteFailed {
            key: key.to_string(),
            message: err.to_string(),
        })?;
        self.notify(key, value);
        Ok(())
    }

    fn subscribe(&self, listener: Listener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn name(&self) -> &'static str {
        "json-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("timer.state").unwrap(), None);
        store.set("timer.state", "{\"running\":false}").unwrap();
        assert_eq!(
            store.get("timer.state").unwrap(),
            Some("{\"running\":false}".to_string())
        );
    }

    #[test]
    fn overwrite_replaces_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("two".to_string()));
    }

    #[test]
    fn odd_keys_map_to_safe_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.set("weird/key name", "v").unwrap();
        assert_eq!(store.get("weird/key name").unwrap(), Some("v".to_string()));
    }
}
