//! # Scene Cache
//!
//! Keeps a bounded set of loaded scenes in memory, loads new ones in the
//! background by priority, and swaps the foreground scene while preserving
//! the outgoing scene's state.
//!
//! ## Architecture
//!
//! ```text
//! load_async ──→ [LoadQueue] ──tick──→ [running tasks] ──poll──→ SceneResourceProvider
//!                 priority desc,          ≤ concurrency_cap           │
//!                 arrival asc                                         ↓
//!                                    Loaded ──switch_to──→ Active (at most one)
//!                                       │
//!                         enforce_limits (LRU, never Active)
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Single foreground | At most one scene is `Active` |
//! | Active pinned | Eviction never selects the `Active` scene |
//! | No mid-flight cancel | A `Loading` scene cannot be unloaded |
//! | Bounded concurrency | Running loads never exceed `concurrency_cap` |
//! | No auto-retry | A failed load stays in `Error` until requested again |
//! | Round trip | preserve then restore reapplies the captured values |
//!
//! ## Crate Structure
//!
//! - `domain/` - Entities, queue ordering, eviction choice, snapshots
//! - `ports/` - Outbound provider port and a staged test provider
//! - `service/` - `SceneCacheManager`
//!
//! ## Usage
//!
//! ```ignore
//! use scene_cache::{SceneCacheConfig, SceneCacheManager, StagedSceneProvider};
//!
//! let mut cache = SceneCacheManager::new(
//!     SceneCacheConfig::default(),
//!     Box::new(StagedSceneProvider::new(3)),
//!     Arc::new(SystemTimeSource),
//! );
//! cache.register_scene("lab", "scenes/lab")?;
//! cache.switch_to(&SceneId::new("lab"))?;
//! loop { cache.tick(); }
//! ```

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::config::SceneCacheConfig;
pub use domain::entities::{
    LoadProgress, LoadRequest, LoadTask, ResourceHandle, SceneDescriptor, SceneLoadingState,
};
pub use domain::errors::SceneError;
pub use domain::snapshot::{
    GlobalState, StateCategory, StateParticipant, StatePreservationStore, StateSnapshot,
};
pub use ports::outbound::{LoadPoll, SceneResourceProvider, StagedSceneProvider, LOAD_STAGES};
pub use service::{
    CacheTickReport, SceneCacheManager, SwapOutcome, FOREGROUND_PRIORITY, SNAPSHOT_KEY_PREFIX,
};
