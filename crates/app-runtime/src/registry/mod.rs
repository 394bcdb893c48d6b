//! # Subsystem Registry
//!
//! Per-subsystem bookkeeping: the registered handle, its lifecycle state,
//! the last health snapshot, and the recovery counters.
//!
//! ## How It Works
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    SubsystemRegistry                       │
//! │                                                            │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐    │
//! │  │  Config  │  │  Assets  │  │  Audio   │  │   ...    │    │
//! │  │  READY   │  │  ERROR   │  │ NOT INIT │  │          │    │
//! │  └──────────┘  └──────────┘  └──────────┘  └──────────┘    │
//! │                                                            │
//! │  get_subsystem(id) ── Ready? ──→ handle                    │
//! │                   └── else ───→ NotReady / NotRegistered   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry never drives a subsystem. The coordinator and the recovery
//! controller call the subsystem and record the outcome here; every state
//! change is checked against the lifecycle edges.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_types::{
    HealthSnapshot, LifecycleState, Subsystem, SubsystemError, SubsystemErrorKind, SubsystemId,
};
use tracing::{debug, info};

/// Where a subsystem's current `Error` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureOrigin {
    /// `initialize()` failed during boot. Needs explicit re-init.
    Startup,
    /// A health check failed after the subsystem was `Ready`.
    Runtime,
}

/// Bookkeeping for one registered subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemDescriptor {
    pub id: SubsystemId,
    /// Registration order, used when no init order has been run yet.
    pub order: usize,
    pub state: LifecycleState,
    pub last_health: Option<HealthSnapshot>,
    pub recovery_attempts: u32,
    pub failure_origin: Option<FailureOrigin>,
    /// Recovery gave up; no further attempts until reset.
    pub recovery_exhausted: bool,
    pub last_error: Option<String>,
}

impl SubsystemDescriptor {
    fn new(id: SubsystemId, order: usize) -> Self {
        Self {
            id,
            order,
            state: LifecycleState::NotInitialized,
            last_health: None,
            recovery_attempts: 0,
            failure_origin: None,
            recovery_exhausted: false,
            last_error: None,
        }
    }
}

struct RegistryEntry {
    subsystem: Arc<dyn Subsystem>,
    /// Same object as `subsystem`, kept for typed lookups.
    concrete: Arc<dyn Any + Send + Sync>,
    descriptor: SubsystemDescriptor,
}

/// The central subsystem registry.
///
/// Keyed by the closed `SubsystemId` set; lookups by string go through
/// `SubsystemId::from_name` first.
#[derive(Default)]
pub struct SubsystemRegistry {
    entries: RwLock<HashMap<SubsystemId, RegistryEntry>>,
}

impl SubsystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subsystem under `id`.
    pub fn register<S>(&self, id: SubsystemId, subsystem: Arc<S>) -> Result<(), SubsystemError>
    where
        S: Subsystem + 'static,
    {
        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            return Err(SubsystemError::new(
                id,
                SubsystemErrorKind::AlreadyRegistered,
                "subsystem is already registered",
            ));
        }

        info!("[Registry] Registering subsystem: {}", id);
        let order = entries.len();
        let concrete: Arc<dyn Any + Send + Sync> = subsystem.clone();
        entries.insert(
            id,
            RegistryEntry {
                subsystem,
                concrete,
                descriptor: SubsystemDescriptor::new(id, order),
            },
        );
        Ok(())
    }

    pub fn is_registered(&self, id: SubsystemId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<SubsystemId> {
        let entries = self.entries.read();
        let mut ids: Vec<(usize, SubsystemId)> = entries
            .values()
            .map(|e| (e.descriptor.order, e.descriptor.id))
            .collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Lifecycle state; `None` when not registered.
    pub fn state(&self, id: SubsystemId) -> Option<LifecycleState> {
        self.entries.read().get(&id).map(|e| e.descriptor.state)
    }

    /// Copy of the descriptor.
    pub fn descriptor(&self, id: SubsystemId) -> Option<SubsystemDescriptor> {
        self.entries.read().get(&id).map(|e| e.descriptor.clone())
    }

    /// Copies of every descriptor, in registration order.
    pub fn descriptors(&self) -> Vec<SubsystemDescriptor> {
        let entries = self.entries.read();
        let mut all: Vec<SubsystemDescriptor> =
            entries.values().map(|e| e.descriptor.clone()).collect();
        all.sort_by_key(|d| d.order);
        all
    }

    /// Handle regardless of state. For the coordinator and recovery only.
    pub(crate) fn handle(&self, id: SubsystemId) -> Option<Arc<dyn Subsystem>> {
        self.entries.read().get(&id).map(|e| e.subsystem.clone())
    }

    /// Handle of a `Ready` subsystem.
    pub fn ready_handle(&self, id: SubsystemId) -> Result<Arc<dyn Subsystem>, SubsystemError> {
        let entries = self.entries.read();
        let entry = Self::ready_entry(&entries, id)?;
        Ok(entry.subsystem.clone())
    }

    /// Typed handle of a `Ready` subsystem.
    pub fn ready_as<T>(&self, id: SubsystemId) -> Result<Arc<T>, SubsystemError>
    where
        T: Subsystem + 'static,
    {
        let entries = self.entries.read();
        let entry = Self::ready_entry(&entries, id)?;
        entry.concrete.clone().downcast::<T>().map_err(|_| {
            SubsystemError::new(
                id,
                SubsystemErrorKind::TypeMismatch,
                format!("registered subsystem is not a {}", std::any::type_name::<T>()),
            )
        })
    }

    fn ready_entry(
        entries: &HashMap<SubsystemId, RegistryEntry>,
        id: SubsystemId,
    ) -> Result<&RegistryEntry, SubsystemError> {
        let entry = entries.get(&id).ok_or_else(|| {
            SubsystemError::new(id, SubsystemErrorKind::NotRegistered, "subsystem is not registered")
        })?;
        if entry.descriptor.state != LifecycleState::Ready {
            return Err(SubsystemError::not_ready(
                id,
                format!("subsystem is {:?}", entry.descriptor.state),
            ));
        }
        Ok(entry)
    }

    /// Move along a forward lifecycle edge.
    pub fn advance(&self, id: SubsystemId, next: LifecycleState) -> Result<(), SubsystemError> {
        self.update(id, |d| {
            if !d.state.can_advance_to(next) {
                return Err(SubsystemError::new(
                    id,
                    SubsystemErrorKind::IllegalLifecycle,
                    format!("{:?} -> {:?}", d.state, next),
                ));
            }
            debug!("[Registry] {}: {:?} -> {:?}", id, d.state, next);
            d.state = next;
            Ok(())
        })
    }

    /// Explicit reset `Error -> Initializing` for a retry.
    pub(crate) fn reset_for_retry(&self, id: SubsystemId) -> Result<(), SubsystemError> {
        self.update(id, |d| {
            if d.state != LifecycleState::Error {
                return Err(SubsystemError::new(
                    id,
                    SubsystemErrorKind::IllegalLifecycle,
                    format!("reset from {:?}", d.state),
                ));
            }
            debug!("[Registry] {}: Error -> Initializing (reset)", id);
            d.state = LifecycleState::Initializing;
            Ok(())
        })
    }

    /// `Initializing -> Ready`, clearing failure bookkeeping.
    pub(crate) fn mark_ready(&self, id: SubsystemId) -> Result<(), SubsystemError> {
        self.advance(id, LifecycleState::Ready)?;
        self.update(id, |d| {
            d.failure_origin = None;
            d.last_error = None;
            Ok(())
        })
    }

    /// Move to `Error` and record why.
    pub(crate) fn mark_failed(
        &self,
        id: SubsystemId,
        origin: FailureOrigin,
        message: impl Into<String>,
    ) -> Result<(), SubsystemError> {
        self.advance(id, LifecycleState::Error)?;
        let message = message.into();
        self.update(id, |d| {
            d.failure_origin = Some(origin);
            d.last_error = Some(message);
            Ok(())
        })
    }

    pub(crate) fn record_health(&self, id: SubsystemId, snapshot: HealthSnapshot) {
        let _ = self.update(id, |d| {
            d.last_health = Some(snapshot);
            Ok(())
        });
    }

    /// Increment and return the recovery counter.
    pub(crate) fn bump_recovery(&self, id: SubsystemId) -> u32 {
        let mut attempts = 0;
        let _ = self.update(id, |d| {
            d.recovery_attempts += 1;
            attempts = d.recovery_attempts;
            Ok(())
        });
        attempts
    }

    pub(crate) fn mark_exhausted(&self, id: SubsystemId) {
        let _ = self.update(id, |d| {
            d.recovery_exhausted = true;
            Ok(())
        });
    }

    pub(crate) fn clear_recovery(&self, id: SubsystemId) {
        let _ = self.update(id, |d| {
            d.recovery_attempts = 0;
            d.recovery_exhausted = false;
            Ok(())
        });
    }

    fn update<F>(&self, id: SubsystemId, f: F) -> Result<(), SubsystemError>
    where
        F: FnOnce(&mut SubsystemDescriptor) -> Result<(), SubsystemError>,
    {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(&id).ok_or_else(|| {
            SubsystemError::new(id, SubsystemErrorKind::NotRegistered, "subsystem is not registered")
        })?;
        f(&mut entry.descriptor)
    }

    /// Print registry status.
    pub fn print_status(&self) {
        info!("===========================================");
        info!("  SUBSYSTEM REGISTRY STATUS");
        info!("===========================================");

        for d in self.descriptors() {
            let icon = match d.state {
                LifecycleState::Ready => "✅",
                LifecycleState::Error => "❌",
                LifecycleState::NotInitialized => "⏹️ ",
                LifecycleState::Initializing | LifecycleState::ShuttingDown => "⏳",
            };
            let exhausted = if d.recovery_exhausted { " [EXHAUSTED]" } else { "" };
            info!("  {} {:14} {:?}{}", icon, d.id.name(), d.state, exhausted);
        }

        info!("===========================================");
    }
}
