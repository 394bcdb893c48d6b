//! # Domain Errors
//!
//! Every rejected cache request maps to one variant. Rejections never
//! mutate the cache.

use shared_types::{PersistenceError, SceneId};
use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// Scene id is not in the catalog.
    #[error("Scene not found: {scene_id}")]
    SceneNotFound { scene_id: SceneId },

    /// Scene id is already in the catalog.
    #[error("Scene already registered: {scene_id}")]
    AlreadyRegistered { scene_id: SceneId },

    /// A load for this scene is queued or running.
    #[error("Scene already loading: {scene_id}")]
    AlreadyLoading { scene_id: SceneId },

    /// The scene is already cached.
    #[error("Scene already cached: {scene_id}")]
    AlreadyCached { scene_id: SceneId },

    /// Unload refused (active scene without force, or mid-load).
    #[error("Eviction refused for {scene_id}: {reason}")]
    EvictionRefused {
        scene_id: SceneId,
        reason: &'static str,
    },

    /// Unload of a scene that holds no cache entry.
    #[error("Scene not cached: {scene_id}")]
    NotCached { scene_id: SceneId },

    /// No snapshot stored for this scene.
    #[error("No snapshot for scene: {scene_id}")]
    NoSnapshot { scene_id: SceneId },

    /// No persistence store attached.
    #[error("No persistence store attached")]
    NoPersistence,

    /// The persistence collaborator failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
