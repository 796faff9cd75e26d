//! Durable key-value state shared across interactions.
//!
//! The upload cache, the undo history, and the first-run marker are stored
//! through a [`StateStore`] handle passed in at construction. Values are
//! opaque JSON documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Key of the persisted first-run version marker.
pub const VERSION_KEY: &str = "version";

/// Error type for state persistence.
#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("State I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value persistence for pipeline state.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StateStoreError>;
}

/// Read and deserialize a value; malformed values read as absent.
pub fn load<T: DeserializeOwned>(store: &dyn StateStore, key: &str) -> Option<T> {
    let value = store.get(key)?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(target: "pasteup_services::state", key, error = %err, "discarding malformed state");
            None
        }
    }
}

/// Serialize and store a value.
pub fn save<T: Serialize>(store: &dyn StateStore, key: &str, value: &T) -> Result<(), StateStoreError> {
    store.set(key, serde_json::to_value(value)?)
}

/// Records `version` and reports whether it differs from the stored marker.
pub fn is_first_run(store: &dyn StateStore, version: &str) -> bool {
    let previous: Option<String> = load(store, VERSION_KEY);
    if previous.as_deref() == Some(version) {
        return false;
    }

    if let Err(err) = save(store, VERSION_KEY, &version) {
        warn!(target: "pasteup_services::state", error = %err, "failed to record version marker");
    }
    true
}

/// In-memory state, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StateStoreError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
        Ok(())
    }
}

/// State persisted as a single JSON object on disk.
///
/// Writes go to a sibling temp file which is then renamed over the target.
#[derive(Debug)]
pub struct JsonFileStateStore {
    path: PathBuf,
    values: Mutex<serde_json::Map<String, serde_json::Value>>,
}

impl JsonFileStateStore {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(
                    target: "pasteup_services::state",
                    path = %path.display(),
                    error = %err,
                    "state file is corrupt, starting empty"
                );
                serde_json::Map::new()
            }),
            Err(_) => serde_json::Map::new(),
        };

        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &serde_json::Map<String, serde_json::Value>) -> Result<(), StateStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StateStore for JsonFileStateStore {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StateStoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_owned(), value);
        self.persist(&values)
    }
}
