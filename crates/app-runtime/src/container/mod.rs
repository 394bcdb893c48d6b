//! # Runtime Container
//!
//! Configuration for the runtime and the collaborators injected at
//! construction.
//!
//! - Subsystems are initialized in the configured order (fail-fast)
//! - Collaborators (time, persistence, scene provider) are passed in, never
//!   reached through globals

pub mod config;

use std::sync::Arc;

use scene_cache::{SceneResourceProvider, StagedSceneProvider};
use shared_types::{PersistenceStore, SystemTimeSource, TimeSource};

pub use config::{ConfigError, HealthConfig, RuntimeConfig};

/// Collaborators handed to `AppRuntime::new`.
pub struct RuntimeDependencies {
    /// Asset layer used by the scene cache.
    pub provider: Box<dyn SceneResourceProvider>,
    /// Wall clock for timestamps, intervals, and timeouts.
    pub clock: Arc<dyn TimeSource>,
    /// Save collaborator for session records and scene snapshots.
    pub persistence: Option<Arc<dyn PersistenceStore>>,
}

impl RuntimeDependencies {
    pub fn new(provider: Box<dyn SceneResourceProvider>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            provider,
            clock,
            persistence: None,
        }
    }

    /// Attach the persistence collaborator.
    pub fn with_persistence(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.persistence = Some(store);
        self
    }
}

impl Default for RuntimeDependencies {
    /// System clock and a staged provider that finishes each load after
    /// three polls.
    fn default() -> Self {
        Self::new(
            Box::new(StagedSceneProvider::new(3)),
            Arc::new(SystemTimeSource),
        )
    }
}
