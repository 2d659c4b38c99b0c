//! Durable persistence of the consent decision and category grants.
//!
//! The record is two keys in a string key-value area: a decision flag
//! holding the literal `"true"` and the JSON-encoded preferences. Readers
//! only treat the user as decided when both are present and well formed.

use super::types::{ConsentPreferences, StoredConsent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

pub const CONSENT_FLAG_KEY: &str = "cookieConsent";
pub const PREFERENCES_KEY: &str = "cookiePreferences";
const CONSENT_FLAG_VALUE: &str = "true";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

// ============================================================================
// Backends
// ============================================================================

/// String key-value area the consent record lives in.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Makes previous writes durable.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Process-local backend for tests and embedders without durable storage.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    read_only: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// While read-only every write fails as if the storage area were full.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn writable(&self) -> Result<(), StoreError> {
        if self.read_only.load(Ordering::SeqCst) {
            Err(StoreError::QuotaExceeded)
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writable()?;
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.writable()?;
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Stands in for a durable store that could not be opened. Reads find
/// nothing and every write fails, so decisions are never reported as kept.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn refuse(&self) -> StoreError {
        StoreError::Unavailable(self.reason.clone())
    }
}

impl StorageBackend for UnavailableBackend {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(self.refuse())
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(self.refuse())
    }

    fn flush(&self) -> Result<(), StoreError> {
        Err(self.refuse())
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for std::sync::Arc<B> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn flush(&self) -> Result<(), StoreError> {
        (**self).flush()
    }
}

// ============================================================================
// ConsentStore
// ============================================================================

pub struct ConsentStore {
    backend: Box<dyn StorageBackend>,
}

impl ConsentStore {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Reads the record. Anything other than a complete, well-formed record
    /// reads as undecided.
    pub fn load(&self) -> StoredConsent {
        let flag = match self.backend.get(CONSENT_FLAG_KEY) {
            Ok(flag) => flag,
            Err(e) => {
                warn!("Consent store read failed, treating as undecided: {}", e);
                return StoredConsent::undecided();
            }
        };
        if flag.as_deref() != Some(CONSENT_FLAG_VALUE) {
            return StoredConsent::undecided();
        }

        let raw = match self.backend.get(PREFERENCES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Consent flag present without preferences");
                return StoredConsent::undecided();
            }
            Err(e) => {
                warn!("Consent store read failed, treating as undecided: {}", e);
                return StoredConsent::undecided();
            }
        };

        match serde_json::from_str::<ConsentPreferences>(&raw) {
            Ok(preferences) => StoredConsent::decided(preferences),
            Err(e) => {
                warn!("Stored consent preferences are malformed: {}", e);
                StoredConsent::undecided()
            }
        }
    }

    /// Writes the flag and preferences as one unit. If any step fails, both
    /// keys are put back to what they held before the call. Nothing is
    /// written when the current record cannot be read.
    pub fn save(&self, preferences: &ConsentPreferences) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(preferences)?;
        let previous = self.snapshot()?;

        let result = self
            .backend
            .set(PREFERENCES_KEY, &encoded)
            .and_then(|_| self.backend.set(CONSENT_FLAG_KEY, CONSENT_FLAG_VALUE))
            .and_then(|_| self.backend.flush());

        if let Err(e) = &result {
            warn!("Consent save failed, restoring previous record: {}", e);
            self.restore(previous);
        }
        result
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        let previous = self.snapshot()?;
        let result = self
            .backend
            .remove(CONSENT_FLAG_KEY)
            .and_then(|_| self.backend.remove(PREFERENCES_KEY))
            .and_then(|_| self.backend.flush());

        if let Err(e) = &result {
            warn!("Consent clear failed, restoring previous record: {}", e);
            self.restore(previous);
        }
        result
    }

    fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let snapshot = Snapshot {
            flag: self.backend.get(CONSENT_FLAG_KEY)?,
            preferences: self.backend.get(PREFERENCES_KEY)?,
        };
        Ok(snapshot)
    }

    fn restore(&self, snapshot: Snapshot) {
        for (key, value) in [
            (PREFERENCES_KEY, snapshot.preferences),
            (CONSENT_FLAG_KEY, snapshot.flag),
        ] {
            let outcome = match value {
                Some(v) => self.backend.set(key, &v),
                None => self.backend.remove(key),
            };
            if let Err(e) = outcome {
                debug!("Could not restore {}: {}", key, e);
            }
        }
        let _ = self.backend.flush();
    }
}

struct Snapshot {
    flag: Option<String>,
    preferences: Option<String>,
}
