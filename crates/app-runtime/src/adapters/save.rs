//! # Save Service
//!
//! The Save subsystem doubles as the persistence collaborator. Writes are
//! refused until the subsystem has been initialized and after shutdown.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use shared_types::{
    HealthReport, InMemoryStore, PersistenceError, PersistenceStore, Subsystem, SubsystemError,
};
use tracing::info;

/// In-memory save backend with a lifecycle.
#[derive(Debug, Default)]
pub struct SaveService {
    store: InMemoryStore,
    open: AtomicBool,
}

impl SaveService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Keys under `prefix`, sorted.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.store.keys_with_prefix(prefix)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl Subsystem for SaveService {
    async fn initialize(&self) -> Result<(), SubsystemError> {
        self.open.store(true, Ordering::SeqCst);
        info!("[Save] Store open ({} records)", self.store.len());
        Ok(())
    }

    async fn shutdown(&self) {
        self.open.store(false, Ordering::SeqCst);
        info!("[Save] Store closed");
    }

    async fn health(&self) -> HealthReport {
        if self.is_open() {
            HealthReport::healthy()
        } else {
            HealthReport::unhealthy("store closed")
        }
    }
}

impl PersistenceStore for SaveService {
    fn save(&self, key: &str, blob: Vec<u8>) -> Result<(), PersistenceError> {
        if !self.is_open() {
            return Err(PersistenceError::WriteFailed {
                key: key.to_string(),
                message: "store closed".to_string(),
            });
        }
        self.store.save(key, blob)
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        self.store.load(key)
    }
}
