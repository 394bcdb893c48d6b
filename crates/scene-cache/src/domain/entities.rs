//! # Domain Entities
//!
//! Scene descriptors, load tasks, and the progress view returned to callers.

use serde::{Deserialize, Serialize};
use shared_types::{SceneId, Timestamp};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Loading state of a single scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneLoadingState {
    /// In the catalog, not cached.
    NotLoaded,
    /// A load task is running.
    Loading,
    /// Cached, not in the foreground.
    Loaded,
    /// Cached and in the foreground. At most one scene holds this state.
    Active,
    /// Being released.
    Unloading,
    /// Last load failed.
    Error,
}

impl SceneLoadingState {
    /// Whether the scene holds a resource handle.
    #[must_use]
    pub fn is_cached(self) -> bool {
        matches!(self, SceneLoadingState::Loaded | SceneLoadingState::Active)
    }
}

/// Opaque handle to an instantiated scene resource.
///
/// The cache owns it from load completion until eviction or unload, then
/// hands it back to the provider for release.
#[derive(Clone)]
pub struct ResourceHandle(Arc<dyn Any + Send + Sync>);

impl ResourceHandle {
    /// Wrap any resource.
    pub fn new<T: Any + Send + Sync>(resource: T) -> Self {
        Self(Arc::new(resource))
    }

    /// Borrow the resource as `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResourceHandle(..)")
    }
}

/// A scene in the catalog, cached or not.
#[derive(Debug, Clone)]
pub struct SceneDescriptor {
    pub id: SceneId,
    /// Resource locator understood by the provider.
    pub locator: String,
    pub state: SceneLoadingState,
    /// Provider estimate until loaded, measured size afterwards.
    pub footprint_bytes: u64,
    pub handle: Option<ResourceHandle>,
    pub loaded_at: Option<Timestamp>,
    pub last_activated: Option<Timestamp>,
    /// Reason of the most recent load failure.
    pub last_error: Option<String>,
}

impl SceneDescriptor {
    /// Create a descriptor in `NotLoaded`.
    pub fn new(id: SceneId, locator: impl Into<String>, footprint_bytes: u64) -> Self {
        Self {
            id,
            locator: locator.into(),
            state: SceneLoadingState::NotLoaded,
            footprint_bytes,
            handle: None,
            loaded_at: None,
            last_activated: None,
            last_error: None,
        }
    }

    /// Recency used for eviction: last activation, else load time.
    #[must_use]
    pub fn recency(&self) -> Timestamp {
        self.last_activated.or(self.loaded_at).unwrap_or(0)
    }
}

/// Caller-supplied options for `load_async`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequest {
    /// Higher loads sooner.
    pub priority: i32,
}

impl LoadRequest {
    /// Request with the given priority.
    #[must_use]
    pub fn with_priority(priority: i32) -> Self {
        Self { priority }
    }
}

/// A queued or running load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadTask {
    pub scene_id: SceneId,
    pub priority: i32,
    /// In `[0, 1]`.
    pub progress: f32,
    pub stage: String,
    /// Set when the task is admitted from the queue.
    pub started_at: Option<Timestamp>,
    pub enqueued_at: Timestamp,
    /// Arrival order, used to break priority ties.
    pub sequence: u64,
}

impl LoadTask {
    pub fn new(scene_id: SceneId, priority: i32, enqueued_at: Timestamp, sequence: u64) -> Self {
        Self {
            scene_id,
            priority,
            progress: 0.0,
            stage: "queued".to_string(),
            started_at: None,
            enqueued_at,
            sequence,
        }
    }

    /// Record a progress report, clamped to `[0, 1]` and never regressing.
    pub fn update(&mut self, progress: f32, stage: impl Into<String>) {
        let clamped = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        self.progress = self.progress.max(clamped);
        self.stage = stage.into();
    }
}

/// Answer to `get_progress`.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadProgress {
    /// Waiting for a free slot.
    Queued { priority: i32 },
    /// Running; live task snapshot.
    Loading(LoadTask),
    /// Cached in the background.
    Loaded,
    /// Cached in the foreground.
    Active,
    /// In the catalog, not cached, no task.
    NotLoaded,
    /// Last load failed.
    Failed { reason: String },
    /// Not in the catalog.
    Unknown,
}
