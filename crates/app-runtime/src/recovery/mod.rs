//! # Recovery Controller
//!
//! Bounded re-initialization of subsystems that failed a health check.
//!
//! ## Policy
//!
//! Each call for subsystem X increments X's attempt counter. While the
//! counter is within `max_attempts`, X is reset `Error -> Initializing` and
//! `initialize()` is invoked again. Once the counter exceeds the bound, X is
//! flagged exhausted and left in `Error`; nothing retries it until an
//! operator calls `reset_recovery`.
//!
//! A successful re-init does not clear the counter. It is cleared by the
//! coordinator once a later health check reports `Healthy`, so a subsystem
//! that initializes fine but never turns healthy still runs out of attempts.
//!
//! A permanently failing subsystem therefore sees exactly
//! `max_attempts + 1` calls to `initialize()`: the boot call plus the
//! retries.

use std::sync::Arc;

use shared_bus::{EventPublisher, RuntimeEvent};
use shared_types::{LifecycleState, SubsystemId};
use tracing::{info, warn};

use crate::coordinator::run_initialize;
use crate::registry::{FailureOrigin, SubsystemRegistry};

/// Result of one recovery call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// `initialize()` succeeded; the subsystem is `Ready` again.
    Recovered { attempts: u32 },
    /// `initialize()` failed; the subsystem stays in `Error`.
    StillFailing { attempts: u32 },
    /// The bound was exceeded on this call; no more attempts.
    Exhausted { attempts: u32 },
    /// Not eligible (not in `Error`, unknown, or already exhausted).
    Skipped,
}

/// Bounded-retry re-initialization.
pub struct RecoveryController {
    max_attempts: u32,
    init_timeout_ms: Option<u64>,
    publisher: Arc<dyn EventPublisher>,
}

impl RecoveryController {
    pub fn new(
        max_attempts: u32,
        init_timeout_ms: Option<u64>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            max_attempts,
            init_timeout_ms,
            publisher,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Handle a failure notification for `id`.
    pub async fn recover(&self, registry: &SubsystemRegistry, id: SubsystemId) -> RecoveryOutcome {
        let Some(descriptor) = registry.descriptor(id) else {
            return RecoveryOutcome::Skipped;
        };
        if descriptor.recovery_exhausted || descriptor.state != LifecycleState::Error {
            return RecoveryOutcome::Skipped;
        }
        let Some(subsystem) = registry.handle(id) else {
            return RecoveryOutcome::Skipped;
        };

        let attempts = registry.bump_recovery(id);
        if attempts > self.max_attempts {
            registry.mark_exhausted(id);
            warn!(
                "[Recovery] Giving up on {} after {} attempts; it stays in Error",
                id, self.max_attempts
            );
            self.publisher.publish(RuntimeEvent::RecoveryExhausted {
                subsystem: id,
                attempts: self.max_attempts,
            });
            return RecoveryOutcome::Exhausted {
                attempts: self.max_attempts,
            };
        }

        if let Err(e) = registry.reset_for_retry(id) {
            warn!("[Recovery] Cannot reset {}: {}", id, e);
            return RecoveryOutcome::Skipped;
        }
        info!(
            "[Recovery] Re-initializing {} (attempt {}/{})",
            id, attempts, self.max_attempts
        );

        match run_initialize(&subsystem, self.init_timeout_ms).await {
            Ok(()) => {
                if let Err(e) = registry.mark_ready(id) {
                    warn!("[Recovery] {}", e);
                }
                info!("[Recovery] {} recovered after {} attempt(s)", id, attempts);
                self.publisher.publish(RuntimeEvent::SubsystemRecovered {
                    subsystem: id,
                    attempts,
                });
                RecoveryOutcome::Recovered { attempts }
            }
            Err(reason) => {
                if let Err(e) = registry.mark_failed(id, FailureOrigin::Runtime, reason.clone()) {
                    warn!("[Recovery] {}", e);
                }
                warn!(
                    "[Recovery] {} attempt {}/{} failed: {}",
                    id, attempts, self.max_attempts, reason
                );
                self.publisher.publish(RuntimeEvent::SubsystemFailed {
                    subsystem: id,
                    message: reason,
                    during_startup: false,
                });
                RecoveryOutcome::StillFailing { attempts }
            }
        }
    }
}
