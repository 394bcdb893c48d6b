//! # Lifecycle Coordinator
//!
//! Boots and shuts down subsystems in order, owns the global game-state
//! machine, and runs the periodic health sweep.
//!
//! ## Startup Sequence
//!
//! ```text
//! for id in init_order:
//!     NotInitialized ──→ Initializing ──initialize().await──┬─→ Ready
//!                                                           └─→ Error ──→ abort, GameState = Error
//! all Ready ──→ GameState: Initializing ──→ MainMenu
//! ```
//!
//! Subsystems are awaited one at a time. A failure stops the sequence: the
//! subsystems after it stay `NotInitialized`.
//!
//! ## Locking
//!
//! All state sits behind short-lived `parking_lot` locks. No guard is held
//! across an `.await`, so `initialize()`, `shutdown()`, and `health()` may
//! call back into the coordinator.

pub mod state_machine;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use shared_bus::{EventPublisher, RuntimeEvent};
use shared_types::{
    GameState, LifecycleState, Subsystem, SubsystemError, SubsystemId, TimeSource, Timestamp,
    TransitionError,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::container::RuntimeConfig;
use crate::recovery::{RecoveryController, RecoveryOutcome};
use crate::registry::{FailureOrigin, SubsystemRegistry};

pub use state_machine::{GameStateMachine, SimulationClock};

/// Boot aborted because a subsystem failed to initialize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Startup failure in {subsystem}: {reason}")]
pub struct StartupError {
    pub subsystem: SubsystemId,
    pub reason: String,
}

/// What one health sweep saw and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// `Ready` subsystems whose health was queried.
    pub checked: Vec<SubsystemId>,
    /// Subsystems that reported a non-healthy status this sweep.
    pub unhealthy: Vec<SubsystemId>,
    pub recovered: Vec<SubsystemId>,
    /// Subsystems recovery gave up on this sweep.
    pub exhausted: Vec<SubsystemId>,
}

/// Run `initialize()`, bounded by `timeout_ms` when set.
pub(crate) async fn run_initialize(
    subsystem: &Arc<dyn Subsystem>,
    timeout_ms: Option<u64>,
) -> Result<(), String> {
    match timeout_ms {
        Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), subsystem.initialize())
            .await
        {
            Ok(result) => result.map_err(|e| e.message),
            Err(_) => Err(format!("initialize() timed out after {ms} ms")),
        },
        None => subsystem.initialize().await.map_err(|e| e.message),
    }
}

/// The Lifecycle Coordinator.
pub struct LifecycleCoordinator {
    registry: Arc<SubsystemRegistry>,
    recovery: RecoveryController,
    machine: Mutex<GameStateMachine>,
    /// Order of the last `initialize_all`; shutdown walks it backwards.
    init_order: Mutex<Vec<SubsystemId>>,
    last_sweep: Mutex<Option<Timestamp>>,
    sweep_requested: AtomicBool,
    health_interval_ms: u64,
    init_timeout_ms: Option<u64>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
}

impl LifecycleCoordinator {
    pub fn new(
        registry: Arc<SubsystemRegistry>,
        config: &RuntimeConfig,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let now = clock.now();
        Self {
            registry,
            recovery: RecoveryController::new(
                config.health.max_recovery_attempts,
                config.init_timeout_ms,
                publisher.clone(),
            ),
            machine: Mutex::new(GameStateMachine::new(config.history_capacity, now)),
            init_order: Mutex::new(Vec::new()),
            last_sweep: Mutex::new(None),
            sweep_requested: AtomicBool::new(false),
            health_interval_ms: config.health.interval_ms,
            init_timeout_ms: config.init_timeout_ms,
            publisher,
            clock,
        }
    }

    pub fn registry(&self) -> &Arc<SubsystemRegistry> {
        &self.registry
    }

    // =========================================================================
    // STARTUP / SHUTDOWN
    // =========================================================================

    /// Initialize subsystems in `order`, stopping at the first failure.
    ///
    /// Subsystems already `Ready` are skipped, so calling this again after a
    /// startup failure re-initializes only what is missing.
    pub async fn initialize_all(&self, order: &[SubsystemId]) -> Result<(), StartupError> {
        info!("[Coordinator] Initializing {} subsystems", order.len());
        *self.init_order.lock() = order.to_vec();

        for &id in order {
            let Some(subsystem) = self.registry.handle(id) else {
                return Err(self.abort_startup(id, "subsystem is not registered".to_string()));
            };

            let prepared = match self.registry.state(id) {
                Some(LifecycleState::Ready) => {
                    debug!("[Coordinator] {} already ready, skipping", id);
                    continue;
                }
                Some(LifecycleState::Error) => self.registry.reset_for_retry(id),
                _ => self.registry.advance(id, LifecycleState::Initializing),
            };
            if let Err(e) = prepared {
                return Err(self.abort_startup(id, e.message));
            }

            info!("[Coordinator] Initializing {}", id);
            match run_initialize(&subsystem, self.init_timeout_ms).await {
                Ok(()) => {
                    if let Err(e) = self.registry.mark_ready(id) {
                        warn!("[Coordinator] {}", e);
                    }
                    self.registry.clear_recovery(id);
                    self.publisher
                        .publish(RuntimeEvent::SubsystemReady { subsystem: id });
                }
                Err(reason) => {
                    if let Err(e) =
                        self.registry
                            .mark_failed(id, FailureOrigin::Startup, reason.clone())
                    {
                        warn!("[Coordinator] {}", e);
                    }
                    return Err(self.abort_startup(id, reason));
                }
            }
        }

        if matches!(self.game_state(), GameState::Initializing | GameState::Error) {
            if let Err(e) = self.transition_to_state(GameState::MainMenu, false) {
                warn!("[Coordinator] {}", e);
            }
        }
        info!("[Coordinator] All subsystems ready");
        Ok(())
    }

    fn abort_startup(&self, id: SubsystemId, reason: String) -> StartupError {
        error!("[Coordinator] {} failed to initialize: {}", id, reason);
        self.publisher.publish(RuntimeEvent::SubsystemFailed {
            subsystem: id,
            message: reason.clone(),
            during_startup: true,
        });
        if self.game_state() != GameState::Error {
            // Initializing -> Error is a table edge, but a re-init may start
            // from any state.
            let _ = self.transition_to_state(GameState::Error, true);
        }
        StartupError {
            subsystem: id,
            reason,
        }
    }

    /// Shut down initialized subsystems in reverse init order.
    pub async fn shutdown_all(&self) {
        let order = {
            let order = self.init_order.lock();
            if order.is_empty() {
                self.registry.ids()
            } else {
                order.clone()
            }
        };
        info!("[Coordinator] Shutting down {} subsystems", order.len());

        for &id in order.iter().rev() {
            if !matches!(
                self.registry.state(id),
                Some(LifecycleState::Ready | LifecycleState::Error)
            ) {
                debug!("[Coordinator] {} not initialized, skipping shutdown", id);
                continue;
            }
            let Some(subsystem) = self.registry.handle(id) else {
                continue;
            };
            if let Err(e) = self.registry.advance(id, LifecycleState::ShuttingDown) {
                warn!("[Coordinator] {}", e);
                continue;
            }

            info!("[Coordinator] Shutting down {}", id);
            subsystem.shutdown().await;

            if let Err(e) = self.registry.advance(id, LifecycleState::NotInitialized) {
                warn!("[Coordinator] {}", e);
            }
        }
    }

    // =========================================================================
    // GAME STATE
    // =========================================================================

    /// Move the global state machine.
    ///
    /// Without `force` the edge must be in the adjacency table and must not
    /// be a self-transition. Rejections change nothing.
    pub fn transition_to_state(&self, next: GameState, force: bool) -> Result<(), TransitionError> {
        let now = self.clock.now();
        let from = {
            let mut machine = self.machine.lock();
            if !force {
                if let Err(e) = machine.check(next) {
                    warn!("[Coordinator] Rejected: {}", e);
                    return Err(e);
                }
            }
            machine.apply(next, now)
        };

        if next == GameState::Error {
            self.sweep_requested.store(true, Ordering::SeqCst);
        }
        if force {
            info!("[Coordinator] {} -> {} (forced)", from, next);
        } else {
            info!("[Coordinator] {} -> {}", from, next);
        }
        self.publisher.publish(RuntimeEvent::GameStateChanged {
            from,
            to: next,
            forced: force,
        });
        Ok(())
    }

    pub fn game_state(&self) -> GameState {
        self.machine.lock().current()
    }

    pub fn previous_state(&self) -> Option<GameState> {
        self.machine.lock().previous()
    }

    /// Prior states, oldest first, bounded by the history capacity.
    pub fn state_history(&self) -> Vec<GameState> {
        self.machine.lock().history()
    }

    pub fn is_simulation_paused(&self) -> bool {
        self.machine.lock().is_simulation_paused()
    }

    /// Unpaused milliseconds since the coordinator was created.
    pub fn simulation_time(&self) -> u64 {
        let now = self.clock.now();
        self.machine.lock().simulation_time(now)
    }

    // =========================================================================
    // SUBSYSTEM ACCESS
    // =========================================================================

    /// Handle of a `Ready` subsystem; `NotReady`/`NotRegistered` otherwise.
    pub fn get_subsystem(&self, id: SubsystemId) -> Result<Arc<dyn Subsystem>, SubsystemError> {
        self.registry.ready_handle(id)
    }

    /// Typed handle of a `Ready` subsystem.
    pub fn get_subsystem_as<T>(&self, id: SubsystemId) -> Result<Arc<T>, SubsystemError>
    where
        T: Subsystem + 'static,
    {
        self.registry.ready_as::<T>(id)
    }

    // =========================================================================
    // HEALTH
    // =========================================================================

    /// Whether a sweep is due: interval elapsed, never run, or requested by
    /// entering `Error`.
    pub fn sweep_due(&self) -> bool {
        if self.sweep_requested.load(Ordering::SeqCst) {
            return true;
        }
        match *self.last_sweep.lock() {
            None => true,
            Some(last) => self.clock.now().saturating_sub(last) >= self.health_interval_ms,
        }
    }

    /// Sweep if due.
    pub async fn run_scheduled_sweep(&self) -> Option<SweepReport> {
        if !self.sweep_due() {
            return None;
        }
        Some(self.sweep_health().await)
    }

    /// Query every `Ready` subsystem and hand failures to recovery.
    ///
    /// A healthy report clears the recovery counter of a subsystem that was
    /// re-initialized earlier.
    ///
    /// Subsystems already in `Error` from a runtime failure get one further
    /// recovery attempt per sweep until recovery gives up. Startup failures
    /// are left alone.
    pub async fn sweep_health(&self) -> SweepReport {
        let now = self.clock.now();
        *self.last_sweep.lock() = Some(now);
        self.sweep_requested.store(false, Ordering::SeqCst);

        let mut report = SweepReport::default();
        for id in self.sweep_order() {
            let Some(descriptor) = self.registry.descriptor(id) else {
                continue;
            };

            match descriptor.state {
                LifecycleState::Ready => {
                    let Some(subsystem) = self.registry.handle(id) else {
                        continue;
                    };
                    report.checked.push(id);

                    let health = subsystem.health().await;
                    self.registry.record_health(id, health.clone().at(now));
                    if health.status.is_healthy() {
                        if descriptor.recovery_attempts > 0 {
                            self.registry.clear_recovery(id);
                            info!("[Coordinator] {} healthy again; recovery counter cleared", id);
                        }
                        continue;
                    }

                    warn!(
                        "[Coordinator] {} reported {:?}: {}",
                        id, health.status, health.message
                    );
                    self.publisher.publish(RuntimeEvent::HealthDegraded {
                        subsystem: id,
                        status: health.status,
                        message: health.message.clone(),
                    });
                    if let Err(e) =
                        self.registry
                            .mark_failed(id, FailureOrigin::Runtime, health.message)
                    {
                        warn!("[Coordinator] {}", e);
                        continue;
                    }
                    report.unhealthy.push(id);
                    self.recover(id, &mut report).await;
                }
                LifecycleState::Error
                    if descriptor.failure_origin == Some(FailureOrigin::Runtime)
                        && !descriptor.recovery_exhausted =>
                {
                    self.recover(id, &mut report).await;
                }
                _ => {}
            }
        }
        report
    }

    async fn recover(&self, id: SubsystemId, report: &mut SweepReport) {
        match self.recovery.recover(&self.registry, id).await {
            RecoveryOutcome::Recovered { .. } => report.recovered.push(id),
            RecoveryOutcome::Exhausted { .. } => report.exhausted.push(id),
            RecoveryOutcome::StillFailing { .. } | RecoveryOutcome::Skipped => {}
        }
    }

    fn sweep_order(&self) -> Vec<SubsystemId> {
        let order = self.init_order.lock();
        let mut ids = order.clone();
        drop(order);
        for id in self.registry.ids() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Clear the recovery counter and exhausted flag of `id`.
    pub fn reset_recovery(&self, id: SubsystemId) {
        info!("[Coordinator] Recovery reset for {}", id);
        self.registry.clear_recovery(id);
    }

    pub fn max_recovery_attempts(&self) -> u32 {
        self.recovery.max_attempts()
    }
}
