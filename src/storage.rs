//! Consent storage backed by `tauri-plugin-store`.

use crate::consent::{StorageBackend, StoreError};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tauri::{AppHandle, Runtime};
use tauri_plugin_store::{Store, StoreExt};

pub struct TauriStoreBackend<R: Runtime> {
    store: Arc<Store<R>>,
}

impl<R: Runtime> TauriStoreBackend<R> {
    /// Opens (or creates) the store file. Relative paths resolve against the
    /// app data directory.
    pub fn open(app: &AppHandle<R>, path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = app
            .store(path.as_ref())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { store })
    }
}

impl<R: Runtime> StorageBackend for TauriStoreBackend<R> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.store.get(key).map(|value| match value {
            Value::String(s) => s,
            other => other.to_string(),
        }))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.store.set(key, Value::String(value.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(key);
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.store
            .save()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
