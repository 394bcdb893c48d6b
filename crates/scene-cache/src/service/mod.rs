//! # Scene Cache Service
//!
//! Application service owning the scene catalog, the load queue, the running
//! tasks, and the state-preservation store.
//!
//! ## Scheduling
//!
//! Single-writer and cooperative. Nothing here blocks or spawns: the host
//! calls [`SceneCacheManager::tick`] once per frame, which polls running
//! loads through the provider and then admits queued tasks while slots are
//! free. A load's only suspension points are start, progress, and completion.
//!
//! ## Invariants
//!
//! - At most one scene is `Active`
//! - Eviction never selects the `Active` scene
//! - A scene that is `Loading` cannot be unloaded (no mid-flight cancellation)
//! - Failed loads are never retried automatically

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use shared_bus::{EventPublisher, EvictionReason, NullPublisher, RuntimeEvent};
use shared_types::{PersistenceStore, SceneId, TimeSource, Timestamp};
use tracing::{debug, info, warn};

use crate::domain::config::SceneCacheConfig;
use crate::domain::entities::{
    LoadProgress, LoadRequest, LoadTask, SceneDescriptor, SceneLoadingState,
};
use crate::domain::errors::SceneError;
use crate::domain::eviction::{limit_exceeded, select_victim};
use crate::domain::queue::LoadQueue;
use crate::domain::snapshot::{GlobalState, StateParticipant, StatePreservationStore, StateSnapshot};
use crate::ports::outbound::{LoadPoll, SceneResourceProvider};


/// Priority used for loads started by a foreground swap.
pub const FOREGROUND_PRIORITY: i32 = 1_000;

/// Key prefix for persisted snapshots.
pub const SNAPSHOT_KEY_PREFIX: &str = "snapshot/";

/// Outcome of `switch_to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The target became active immediately.
    Activated,
    /// The target is loading; it becomes active on completion.
    Pending,
    /// The target was already active.
    AlreadyActive,
}

/// What one `tick` did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheTickReport {
    /// Tasks admitted from the queue.
    pub started: Vec<SceneId>,
    /// Loads that finished.
    pub completed: Vec<SceneId>,
    /// Loads that failed, with reasons.
    pub failed: Vec<(SceneId, String)>,
    /// Scene that became active this tick through a pending swap.
    pub activated: Option<SceneId>,
    /// Pending swap target that failed to load this tick.
    pub swap_failed: Option<SceneId>,
}

/// The Scene Cache Manager.
pub struct SceneCacheManager {
    config: SceneCacheConfig,
    scenes: BTreeMap<SceneId, SceneDescriptor>,
    queue: LoadQueue,
    running: HashMap<SceneId, LoadTask>,
    active: Option<SceneId>,
    pending_swap: Option<SceneId>,
    memory_estimate: u64,
    next_sequence: u64,
    states: StatePreservationStore,
    provider: Box<dyn SceneResourceProvider>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
    persistence: Option<Arc<dyn PersistenceStore>>,
}

impl SceneCacheManager {
    /// Create a cache with no event bus attached.
    pub fn new(
        config: SceneCacheConfig,
        provider: Box<dyn SceneResourceProvider>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            config,
            scenes: BTreeMap::new(),
            queue: LoadQueue::new(),
            running: HashMap::new(),
            active: None,
            pending_swap: None,
            memory_estimate: 0,
            next_sequence: 0,
            states: StatePreservationStore::new(),
            provider,
            publisher: Arc::new(NullPublisher),
            clock,
            persistence: None,
        }
    }

    /// Publish cache events to `publisher`.
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Attach the persistence collaborator used for snapshots.
    pub fn with_persistence(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.persistence = Some(store);
        self
    }

    // =========================================================================
    // CATALOG
    // =========================================================================

    /// Add a scene to the catalog.
    pub fn register_scene(
        &mut self,
        scene_id: impl Into<SceneId>,
        locator: impl Into<String>,
    ) -> Result<(), SceneError> {
        let scene_id = scene_id.into();
        if self.scenes.contains_key(&scene_id) {
            return Err(SceneError::AlreadyRegistered { scene_id });
        }
        let locator = locator.into();
        let estimate = self.provider.estimate(&scene_id, &locator);
        debug!(scene = %scene_id, locator = %locator, estimate, "[SceneCache] Scene registered");
        self.scenes.insert(
            scene_id.clone(),
            SceneDescriptor::new(scene_id, locator, estimate),
        );
        Ok(())
    }

    /// Register a state participant captured around every swap.
    pub fn register_participant(&mut self, participant: Arc<dyn StateParticipant>) {
        self.states.register_participant(participant);
    }

    // =========================================================================
    // LOADING
    // =========================================================================

    /// Request a background load.
    ///
    /// Accepted requests are queued; the next queue advancement admits them
    /// while fewer than `concurrency_cap` loads are running.
    pub fn load_async(
        &mut self,
        scene_id: &SceneId,
        request: LoadRequest,
    ) -> Result<(), SceneError> {
        let Some(scene) = self.scenes.get(scene_id) else {
            warn!(scene = %scene_id, "[SceneCache] Load rejected: unknown scene");
            return Err(SceneError::SceneNotFound {
                scene_id: scene_id.clone(),
            });
        };

        if scene.state == SceneLoadingState::Loading || self.queue.contains(scene_id) {
            debug!(scene = %scene_id, "[SceneCache] Load rejected: already in flight");
            return Err(SceneError::AlreadyLoading {
                scene_id: scene_id.clone(),
            });
        }
        if scene.state.is_cached() {
            return Err(SceneError::AlreadyCached {
                scene_id: scene_id.clone(),
            });
        }

        let now = self.clock.now();
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue
            .push(LoadTask::new(scene_id.clone(), request.priority, now, sequence));
        debug!(
            scene = %scene_id,
            priority = request.priority,
            queued = self.queue.len(),
            "[SceneCache] Load queued"
        );
        Ok(())
    }

    /// One scheduler step: poll running loads, then admit queued tasks.
    pub fn tick(&mut self) -> CacheTickReport {
        let mut report = CacheTickReport::default();
        self.poll_running(&mut report);
        self.advance_queue(&mut report);
        report
    }

    /// Admit queued tasks while slots are free.
    pub fn advance_queue(&mut self, report: &mut CacheTickReport) {
        while self.running.len() < self.config.concurrency_cap {
            let Some(mut task) = self.queue.pop() else {
                break;
            };
            let now = self.clock.now();
            let scene_id = task.scene_id.clone();
            let Some(scene) = self.scenes.get_mut(&scene_id) else {
                continue;
            };

            scene.state = SceneLoadingState::Loading;
            scene.last_error = None;
            task.started_at = Some(now);
            task.stage = "starting".to_string();
            info!(
                scene = %scene_id,
                priority = task.priority,
                waited_ms = now.saturating_sub(task.enqueued_at),
                "[SceneCache] Load started"
            );
            self.publisher.publish(RuntimeEvent::SceneLoadStarted {
                scene_id: scene_id.clone(),
                priority: task.priority,
            });
            report.started.push(scene_id.clone());

            let locator = scene.locator.clone();
            match self.provider.begin_load(&scene_id, &locator) {
                Ok(()) => {
                    self.running.insert(scene_id, task);
                }
                Err(reason) => {
                    self.fail_load(&scene_id, reason, &mut report.failed, &mut report.swap_failed)
                }
            }
        }
    }

    fn poll_running(&mut self, report: &mut CacheTickReport) {
        let mut ids: Vec<SceneId> = self.running.keys().cloned().collect();
        ids.sort();

        for scene_id in ids {
            let now = self.clock.now();
            let Some(locator) = self.scenes.get(&scene_id).map(|s| s.locator.clone()) else {
                self.running.remove(&scene_id);
                continue;
            };

            if let (Some(timeout), Some(started)) = (
                self.config.load_timeout_ms,
                self.running.get(&scene_id).and_then(|t| t.started_at),
            ) {
                if now.saturating_sub(started) > timeout {
                    let reason = format!("timed out after {timeout} ms");
                    self.fail_load(&scene_id, reason, &mut report.failed, &mut report.swap_failed);
                    continue;
                }
            }

            match self.provider.poll_load(&scene_id, &locator) {
                LoadPoll::Pending { progress, stage } => {
                    if let Some(task) = self.running.get_mut(&scene_id) {
                        task.update(progress, stage);
                        self.publisher.publish(RuntimeEvent::SceneLoadProgress {
                            scene_id: scene_id.clone(),
                            progress: task.progress,
                            stage: task.stage.clone(),
                        });
                    }
                }
                LoadPoll::Ready { handle, bytes } => {
                    let Some(task) = self.running.remove(&scene_id) else {
                        continue;
                    };
                    let elapsed_ms = now.saturating_sub(task.started_at.unwrap_or(now));
                    if let Some(scene) = self.scenes.get_mut(&scene_id) {
                        scene.state = SceneLoadingState::Loaded;
                        scene.handle = Some(handle);
                        scene.footprint_bytes = bytes;
                        scene.loaded_at = Some(now);
                    }
                    self.memory_estimate = self.memory_estimate.saturating_add(bytes);
                    info!(
                        scene = %scene_id,
                        elapsed_ms,
                        bytes,
                        memory_estimate = self.memory_estimate,
                        "[SceneCache] Load completed"
                    );
                    self.publisher.publish(RuntimeEvent::SceneLoadCompleted {
                        scene_id: scene_id.clone(),
                        elapsed_ms,
                        bytes,
                    });
                    report.completed.push(scene_id.clone());

                    if self.pending_swap.as_ref() == Some(&scene_id) {
                        self.pending_swap = None;
                        self.activate(&scene_id);
                        report.activated = Some(scene_id);
                    }
                }
                LoadPoll::Failed { reason } => {
                    self.fail_load(&scene_id, reason, &mut report.failed, &mut report.swap_failed);
                }
            }
        }
    }

    fn fail_load(
        &mut self,
        scene_id: &SceneId,
        reason: String,
        failed: &mut Vec<(SceneId, String)>,
        swap_failed: &mut Option<SceneId>,
    ) {
        self.running.remove(scene_id);
        if let Some(scene) = self.scenes.get_mut(scene_id) {
            scene.state = SceneLoadingState::Error;
            scene.last_error = Some(reason.clone());
        }
        warn!(scene = %scene_id, reason = %reason, "[SceneCache] Load failed");
        self.publisher.publish(RuntimeEvent::SceneLoadFailed {
            scene_id: scene_id.clone(),
            reason: reason.clone(),
        });
        if self.pending_swap.as_ref() == Some(scene_id) {
            self.pending_swap = None;
            *swap_failed = Some(scene_id.clone());
        }
        failed.push((scene_id.clone(), reason));
    }

    /// Progress of a scene: live task while loading, else terminal status.
    pub fn get_progress(&self, scene_id: &SceneId) -> LoadProgress {
        if let Some(task) = self.running.get(scene_id) {
            return LoadProgress::Loading(task.clone());
        }
        if let Some(task) = self.queue.get(scene_id) {
            return LoadProgress::Queued {
                priority: task.priority,
            };
        }
        match self.scenes.get(scene_id) {
            None => LoadProgress::Unknown,
            Some(scene) => match scene.state {
                SceneLoadingState::Loaded => LoadProgress::Loaded,
                SceneLoadingState::Active => LoadProgress::Active,
                SceneLoadingState::Error => LoadProgress::Failed {
                    reason: scene.last_error.clone().unwrap_or_default(),
                },
                SceneLoadingState::NotLoaded
                | SceneLoadingState::Loading
                | SceneLoadingState::Unloading => LoadProgress::NotLoaded,
            },
        }
    }

    // =========================================================================
    // UNLOAD & EVICTION
    // =========================================================================

    /// Remove a cached scene.
    ///
    /// Refused for the active scene unless `force`, and always refused while
    /// the scene is loading.
    pub fn unload(&mut self, scene_id: &SceneId, force: bool) -> Result<u64, SceneError> {
        let Some(scene) = self.scenes.get(scene_id) else {
            return Err(SceneError::SceneNotFound {
                scene_id: scene_id.clone(),
            });
        };
        match scene.state {
            SceneLoadingState::Loading => {
                return Err(SceneError::EvictionRefused {
                    scene_id: scene_id.clone(),
                    reason: "scene is loading",
                })
            }
            SceneLoadingState::Active if !force => {
                return Err(SceneError::EvictionRefused {
                    scene_id: scene_id.clone(),
                    reason: "scene is active",
                })
            }
            SceneLoadingState::Active | SceneLoadingState::Loaded => {}
            SceneLoadingState::NotLoaded
            | SceneLoadingState::Unloading
            | SceneLoadingState::Error => {
                return Err(SceneError::NotCached {
                    scene_id: scene_id.clone(),
                })
            }
        }

        if self.active.as_ref() == Some(scene_id) {
            let now = self.clock.now();
            self.states.preserve(scene_id, now);
            self.active = None;
            warn!(scene = %scene_id, "[SceneCache] Active scene force-unloaded");
        }
        Ok(self.evict(scene_id, EvictionReason::Explicit))
    }

    fn evict(&mut self, scene_id: &SceneId, reason: EvictionReason) -> u64 {
        let Some(scene) = self.scenes.get_mut(scene_id) else {
            return 0;
        };
        let bytes = scene.footprint_bytes;
        let handle = scene.handle.take();
        scene.loaded_at = None;
        scene.state = SceneLoadingState::NotLoaded;

        if let Some(handle) = handle {
            self.provider.release(scene_id, handle);
        }
        self.memory_estimate = self.memory_estimate.saturating_sub(bytes);
        info!(
            scene = %scene_id,
            bytes,
            reason = ?reason,
            memory_estimate = self.memory_estimate,
            "[SceneCache] Scene evicted"
        );
        self.publisher.publish(RuntimeEvent::SceneEvicted {
            scene_id: scene_id.clone(),
            bytes,
            reason,
        });
        bytes
    }

    /// Evict least-recently-activated scenes until both limits hold.
    ///
    /// Stops early when only the active scene is left; the active scene is
    /// never evicted even if it alone exceeds the threshold.
    pub fn enforce_limits(&mut self) -> Vec<SceneId> {
        let mut evicted = Vec::new();
        while let Some(reason) =
            limit_exceeded(&self.config, self.memory_estimate, self.cached_count())
        {
            let Some(victim) = select_victim(self.scenes.values()) else {
                warn!(
                    memory_estimate = self.memory_estimate,
                    cached = self.cached_count(),
                    "[SceneCache] Over limit but no evictable scene"
                );
                break;
            };
            self.evict(&victim, reason);
            evicted.push(victim);
        }
        evicted
    }

    // =========================================================================
    // FOREGROUND SWAP
    // =========================================================================

    /// Make `target` the foreground scene.
    ///
    /// Loads it first when needed; the swap then happens on the tick that
    /// completes the load.
    pub fn switch_to(&mut self, target: &SceneId) -> Result<SwapOutcome, SceneError> {
        let Some(scene) = self.scenes.get(target) else {
            return Err(SceneError::SceneNotFound {
                scene_id: target.clone(),
            });
        };

        match scene.state {
            SceneLoadingState::Active => Ok(SwapOutcome::AlreadyActive),
            SceneLoadingState::Loaded => {
                self.pending_swap = None;
                self.activate(target);
                Ok(SwapOutcome::Activated)
            }
            SceneLoadingState::Loading => {
                self.pending_swap = Some(target.clone());
                Ok(SwapOutcome::Pending)
            }
            SceneLoadingState::NotLoaded
            | SceneLoadingState::Error
            | SceneLoadingState::Unloading => {
                if !self.queue.contains(target) {
                    self.load_async(target, LoadRequest::with_priority(FOREGROUND_PRIORITY))?;
                }
                self.pending_swap = Some(target.clone());
                Ok(SwapOutcome::Pending)
            }
        }
    }

    /// preserve(current) -> swap active pointer -> restore(target).
    fn activate(&mut self, target: &SceneId) {
        let now = self.clock.now();
        let previous = self.active.take();

        if let Some(prev) = &previous {
            self.states.preserve(prev, now);
            if let Some(scene) = self.scenes.get_mut(prev) {
                if scene.state == SceneLoadingState::Active {
                    scene.state = SceneLoadingState::Loaded;
                }
            }
        }

        if let Some(scene) = self.scenes.get_mut(target) {
            scene.state = SceneLoadingState::Active;
            scene.last_activated = Some(now);
        }
        self.active = Some(target.clone());
        let restored = self.states.restore(target);

        info!(
            scene = %target,
            previous = ?previous.as_ref().map(SceneId::as_str),
            restored,
            "[SceneCache] Scene activated"
        );
        self.publisher.publish(RuntimeEvent::SceneActivated {
            scene_id: target.clone(),
            previous,
        });
    }

    // =========================================================================
    // STATE PRESERVATION
    // =========================================================================

    /// Snapshot a scene's state now, replacing any prior snapshot.
    pub fn preserve_state(&mut self, scene_id: &SceneId) -> Result<StateSnapshot, SceneError> {
        if !self.scenes.contains_key(scene_id) {
            return Err(SceneError::SceneNotFound {
                scene_id: scene_id.clone(),
            });
        }
        let now = self.clock.now();
        Ok(self.states.preserve(scene_id, now).clone())
    }

    /// Reapply the stored snapshot. `Ok(false)` when none exists.
    pub fn restore_state(&self, scene_id: &SceneId) -> Result<bool, SceneError> {
        if !self.scenes.contains_key(scene_id) {
            return Err(SceneError::SceneNotFound {
                scene_id: scene_id.clone(),
            });
        }
        Ok(self.states.restore(scene_id))
    }

    pub fn snapshot(&self, scene_id: &SceneId) -> Option<&StateSnapshot> {
        self.states.snapshot(scene_id)
    }

    pub fn clear_snapshot(&mut self, scene_id: &SceneId) -> Option<StateSnapshot> {
        self.states.remove(scene_id)
    }

    /// Write a scene's snapshot through the persistence collaborator.
    pub fn persist_snapshot(&self, scene_id: &SceneId) -> Result<(), SceneError> {
        let store = self.persistence.as_ref().ok_or(SceneError::NoPersistence)?;
        let snapshot = self
            .states
            .snapshot(scene_id)
            .ok_or_else(|| SceneError::NoSnapshot {
                scene_id: scene_id.clone(),
            })?;
        let blob = serde_json::to_vec(snapshot).map_err(shared_types::PersistenceError::from)?;
        store.save(&format!("{SNAPSHOT_KEY_PREFIX}{scene_id}"), blob)?;
        debug!(scene = %scene_id, "[SceneCache] Snapshot persisted");
        Ok(())
    }

    /// Load a persisted snapshot into the store, replacing the in-memory one.
    /// When the scene is in the foreground the snapshot is reapplied at once.
    ///
    /// Returns `Ok(false)` when nothing was persisted for the scene.
    pub fn restore_persisted_snapshot(&mut self, scene_id: &SceneId) -> Result<bool, SceneError> {
        let store = self.persistence.as_ref().ok_or(SceneError::NoPersistence)?;
        let Some(blob) = store.load(&format!("{SNAPSHOT_KEY_PREFIX}{scene_id}"))? else {
            return Ok(false);
        };
        let snapshot: StateSnapshot =
            serde_json::from_slice(&blob).map_err(shared_types::PersistenceError::from)?;
        self.states.insert(snapshot);
        if self.active.as_ref() == Some(scene_id) {
            self.states.restore(scene_id);
        }
        Ok(true)
    }

    pub fn global_state(&self) -> &GlobalState {
        self.states.global()
    }

    pub fn global_state_mut(&mut self) -> &mut GlobalState {
        self.states.global_mut()
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn scene(&self, scene_id: &SceneId) -> Option<&SceneDescriptor> {
        self.scenes.get(scene_id)
    }

    pub fn scenes(&self) -> impl Iterator<Item = &SceneDescriptor> {
        self.scenes.values()
    }

    pub fn active_scene(&self) -> Option<&SceneId> {
        self.active.as_ref()
    }

    pub fn pending_swap(&self) -> Option<&SceneId> {
        self.pending_swap.as_ref()
    }

    /// Scenes in `Loaded` or `Active`.
    pub fn cached_count(&self) -> usize {
        self.scenes.values().filter(|s| s.state.is_cached()).count()
    }

    /// Aggregate footprint of cached scenes.
    pub fn memory_estimate(&self) -> u64 {
        self.memory_estimate
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    /// Queued scene ids in admission order.
    pub fn queued_order(&self) -> Vec<SceneId> {
        self.queue.pending_order()
    }

    pub fn config(&self) -> &SceneCacheConfig {
        &self.config
    }

    /// Time source shared with the owner.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}
