//! # Scripted Subsystem
//!
//! A subsystem whose behaviour is set from outside: how many initialization
//! attempts fail, and what `health()` reports. Used by the demo binary and
//! by tests to drive startup failures and runtime recovery.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{HealthReport, Subsystem, SubsystemError, SubsystemId};
use tracing::debug;

/// Sentinel for "fail every attempt".
const FAIL_FOREVER: u32 = u32::MAX;

/// Scripted stand-in for an engine service.
pub struct ScriptedSubsystem {
    id: SubsystemId,
    failures_left: AtomicU32,
    failure_reason: Mutex<String>,
    health: Mutex<HealthReport>,
    running: AtomicBool,
    init_calls: AtomicU32,
    shutdown_calls: AtomicU32,
}

impl ScriptedSubsystem {
    /// A subsystem that initializes and stays healthy.
    pub fn new(id: SubsystemId) -> Self {
        Self {
            id,
            failures_left: AtomicU32::new(0),
            failure_reason: Mutex::new(String::new()),
            health: Mutex::new(HealthReport::healthy()),
            running: AtomicBool::new(false),
            init_calls: AtomicU32::new(0),
            shutdown_calls: AtomicU32::new(0),
        }
    }

    /// Fail the next `count` initialization attempts with `reason`.
    pub fn failing(self, count: u32, reason: impl Into<String>) -> Self {
        self.fail_next(count, reason);
        self
    }

    /// Script failures on a subsystem that is already registered.
    pub fn fail_next(&self, count: u32, reason: impl Into<String>) {
        self.failures_left.store(count, Ordering::SeqCst);
        *self.failure_reason.lock() = reason.into();
    }

    /// Fail every initialization attempt from now on.
    pub fn fail_always(&self, reason: impl Into<String>) {
        self.fail_next(FAIL_FOREVER, reason);
    }

    /// Fail every initialization attempt with `reason`.
    pub fn always_failing(self, reason: impl Into<String>) -> Self {
        self.failing(FAIL_FOREVER, reason)
    }

    /// Change what `health()` reports from now on.
    pub fn set_health(&self, report: HealthReport) {
        *self.health.lock() = report;
    }

    /// Let initialization succeed from now on.
    pub fn heal(&self) {
        self.failures_left.store(0, Ordering::SeqCst);
        self.set_health(HealthReport::healthy());
    }

    pub fn id(&self) -> SubsystemId {
        self.id
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of `initialize()` calls so far.
    pub fn init_calls(&self) -> u32 {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Number of `shutdown()` calls so far.
    pub fn shutdown_calls(&self) -> u32 {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                FAIL_FOREVER => Some(FAIL_FOREVER),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

#[async_trait]
impl Subsystem for ScriptedSubsystem {
    async fn initialize(&self) -> Result<(), SubsystemError> {
        let call = self.init_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.take_failure() {
            let reason = self.failure_reason.lock().clone();
            debug!("[{}] Scripted init failure #{}: {}", self.id, call, reason);
            return Err(SubsystemError::init_failed(self.id, reason));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self) {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    async fn health(&self) -> HealthReport {
        self.health.lock().clone()
    }
}
