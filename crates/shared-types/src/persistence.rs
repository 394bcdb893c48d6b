//! # Persistence Port
//!
//! Narrow contract to the external save collaborator. Session records and
//! scene snapshots are handed over as opaque blobs; durability and on-disk
//! format are the collaborator's business.
//!
//! Production: the Save subsystem implements this trait.
//! Testing: `InMemoryStore` (below).

use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by a persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// Backend refused or failed the write.
    #[error("Write failed for '{key}': {message}")]
    WriteFailed { key: String, message: String },

    /// Backend failed the read.
    #[error("Read failed for '{key}': {message}")]
    ReadFailed { key: String, message: String },

    /// Blob could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

/// Abstract interface for the save collaborator.
pub trait PersistenceStore: Send + Sync {
    /// Store a blob under `key`, replacing any previous value.
    fn save(&self, key: &str, blob: Vec<u8>) -> Result<(), PersistenceError>;

    /// Load the blob stored under `key`.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
}

/// In-memory store for tests and the demo binary.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Keys starting with `prefix`, sorted.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .data
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl PersistenceStore for InMemoryStore {
    fn save(&self, key: &str, blob: Vec<u8>) -> Result<(), PersistenceError> {
        self.data.write().insert(key.to_string(), blob);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.data.read().get(key).cloned())
    }
}
