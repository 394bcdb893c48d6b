//! # App Runtime
//!
//! The one explicitly constructed owner of every runtime component.
//!
//! ## Tick Order
//!
//! ```text
//! tick()
//!   ├─ 1. health sweep (if due)        LifecycleCoordinator
//!   ├─ 2. poll loads, advance queue    SceneCacheManager::tick
//!   ├─ 3. eviction check               SceneCacheManager::enforce_limits
//!   └─ 4. settle a pending scene change (Loading -> Playing | MainMenu)
//! ```
//!
//! The scene cache and session manager sit behind `parking_lot::Mutex`;
//! no guard is held across an `.await`.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use scene_cache::{CacheTickReport, SceneCacheManager, SceneError, SwapOutcome};
use serde_json::Value;
use shared_bus::{EventFilter, EventStream, InMemoryEventBus, Subscription};
use shared_types::{GameState, SceneId, Subsystem, SubsystemError, SubsystemId, TransitionError};
use thiserror::Error;
use tracing::{info, warn};

use crate::container::{ConfigError, RuntimeConfig, RuntimeDependencies};
use crate::coordinator::{LifecycleCoordinator, StartupError, SweepReport};
use crate::registry::SubsystemRegistry;
use crate::session::{SessionError, SessionManager};

/// Errors surfaced by the façade.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Subsystem(#[from] SubsystemError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// What one `AppRuntime::tick` did.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeTick {
    /// Present when a health sweep ran this tick.
    pub sweep: Option<SweepReport>,
    pub cache: CacheTickReport,
    /// Scenes dropped by the eviction check.
    pub evicted: Vec<SceneId>,
    /// Game state after the tick.
    pub game_state: GameState,
}

/// The application runtime.
pub struct AppRuntime {
    config: RuntimeConfig,
    coordinator: LifecycleCoordinator,
    sessions: Mutex<SessionManager>,
    scenes: Mutex<SceneCacheManager>,
    bus: Arc<InMemoryEventBus>,
    /// Target of a `change_scene` still waiting for its load.
    pending_change: Mutex<Option<SceneId>>,
}

impl AppRuntime {
    /// Build a runtime from validated config and injected collaborators.
    pub fn new(config: RuntimeConfig, deps: RuntimeDependencies) -> Result<Self, RuntimeError> {
        config.validate()?;

        let bus = Arc::new(InMemoryEventBus::new());
        let registry = Arc::new(SubsystemRegistry::new());
        let coordinator =
            LifecycleCoordinator::new(registry, &config, bus.clone(), deps.clock.clone());

        let mut sessions = SessionManager::new(deps.clock.clone(), bus.clone());
        let mut scenes =
            SceneCacheManager::new(config.scene_cache.clone(), deps.provider, deps.clock)
                .with_publisher(bus.clone());
        if let Some(store) = deps.persistence {
            sessions = sessions.with_persistence(store.clone());
            scenes = scenes.with_persistence(store);
        }

        info!(
            "[Runtime] Created with {} subsystems in init order",
            config.init_order.len()
        );
        Ok(Self {
            config,
            coordinator,
            sessions: Mutex::new(sessions),
            scenes: Mutex::new(scenes),
            bus,
            pending_change: Mutex::new(None),
        })
    }

    // =========================================================================
    // WIRING
    // =========================================================================

    pub fn register_subsystem<S>(&self, id: SubsystemId, subsystem: Arc<S>) -> Result<(), RuntimeError>
    where
        S: Subsystem + 'static,
    {
        self.registry().register(id, subsystem)?;
        Ok(())
    }

    pub fn register_scene(
        &self,
        scene_id: impl Into<SceneId>,
        locator: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        self.scenes.lock().register_scene(scene_id, locator)?;
        Ok(())
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Initialize every subsystem in the configured order.
    pub async fn boot(&self) -> Result<(), RuntimeError> {
        self.coordinator
            .initialize_all(&self.config.init_order)
            .await?;
        Ok(())
    }

    /// End the live session (persisted) and shut subsystems down in reverse
    /// order.
    pub async fn shutdown(&self) {
        info!("[Runtime] Shutting down");
        let duration = self.sessions.lock().end_session(true);
        if duration > 0 {
            info!("[Runtime] Final session lasted {} ms", duration);
        }
        self.coordinator.shutdown_all().await;
    }

    /// One cooperative step of the runtime.
    pub async fn tick(&self) -> RuntimeTick {
        let sweep = self.coordinator.run_scheduled_sweep().await;

        let (cache, evicted) = {
            let mut scenes = self.scenes.lock();
            let cache = scenes.tick();
            let evicted = scenes.enforce_limits();
            (cache, evicted)
        };
        self.settle_scene_change(&cache);

        RuntimeTick {
            sweep,
            cache,
            evicted,
            game_state: self.coordinator.game_state(),
        }
    }

    // =========================================================================
    // SCENES
    // =========================================================================

    /// Enter `Loading` and bring `target` to the foreground.
    ///
    /// A cached target activates at once and the game moves on to
    /// `Playing`. Otherwise the game stays in `Loading` until a later tick
    /// completes or fails the load.
    pub fn change_scene(&self, target: impl Into<SceneId>) -> Result<SwapOutcome, RuntimeError> {
        let target = target.into();
        if self.coordinator.game_state() != GameState::Loading {
            self.coordinator
                .transition_to_state(GameState::Loading, false)?;
        }

        let outcome = self.scenes.lock().switch_to(&target);
        match outcome {
            Ok(SwapOutcome::Pending) => {
                info!("[Runtime] Waiting for {} to load", target);
                *self.pending_change.lock() = Some(target);
                Ok(SwapOutcome::Pending)
            }
            Ok(done) => {
                *self.pending_change.lock() = None;
                self.coordinator
                    .transition_to_state(GameState::Playing, false)?;
                Ok(done)
            }
            Err(e) => {
                warn!("[Runtime] Scene change to {} failed: {}", target, e);
                *self.pending_change.lock() = None;
                self.coordinator
                    .transition_to_state(GameState::MainMenu, false)?;
                Err(e.into())
            }
        }
    }

    fn settle_scene_change(&self, cache: &CacheTickReport) {
        let mut pending = self.pending_change.lock();
        let Some(target) = pending.clone() else {
            return;
        };

        let next = if cache.activated.as_ref() == Some(&target) {
            GameState::Playing
        } else if cache.swap_failed.as_ref() == Some(&target) {
            GameState::MainMenu
        } else {
            return;
        };
        *pending = None;
        drop(pending);

        if self.coordinator.game_state() != GameState::Loading {
            warn!(
                "[Runtime] Scene change to {} settled outside Loading, state left as is",
                target
            );
            return;
        }
        if let Err(e) = self.coordinator.transition_to_state(next, false) {
            warn!("[Runtime] {}", e);
        }
    }

    /// Target of a scene change still loading.
    pub fn pending_scene_change(&self) -> Option<SceneId> {
        self.pending_change.lock().clone()
    }

    /// Lock the scene cache. Do not hold the guard across an `.await`.
    pub fn scenes(&self) -> MutexGuard<'_, SceneCacheManager> {
        self.scenes.lock()
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    pub fn start_session(
        &self,
        session_type: impl Into<String>,
        config: BTreeMap<String, Value>,
    ) -> Result<String, RuntimeError> {
        let state = self.coordinator.game_state();
        Ok(self
            .sessions
            .lock()
            .start_session(state, session_type, config)?)
    }

    pub fn record_session_event(
        &self,
        name: impl Into<String>,
        data: Value,
    ) -> Result<(), RuntimeError> {
        self.sessions.lock().record_event(name, data)?;
        Ok(())
    }

    /// End the live session; returns its duration (zero when none).
    pub fn end_session(&self, persist: bool) -> u64 {
        self.sessions.lock().end_session(persist)
    }

    /// Lock the session manager.
    pub fn sessions(&self) -> MutexGuard<'_, SessionManager> {
        self.sessions.lock()
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn game_state(&self) -> GameState {
        self.coordinator.game_state()
    }

    pub fn coordinator(&self) -> &LifecycleCoordinator {
        &self.coordinator
    }

    pub fn registry(&self) -> &Arc<SubsystemRegistry> {
        self.coordinator.registry()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.bus.subscribe(filter)
    }

    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.bus.event_stream(filter)
    }
}
