//! # Subsystem Trait
//!
//! Defines the contract that every managed collaborator (audio, UI, input,
//! localization, save, content) implements so the lifecycle coordinator can
//! boot, probe, and stop it.
//!
//! The coordinator calls exactly three operations and assumes nothing else
//! about a subsystem:
//!
//! - `initialize()` - may suspend; awaited to completion before the next
//!   subsystem in the init order is touched
//! - `shutdown()` - best effort, never fails the shutdown sequence
//! - `health()` - optional self-report polled by the health sweep
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use shared_types::{Subsystem, SubsystemError, SubsystemId};
//!
//! pub struct AudioEngine { /* ... */ }
//!
//! #[async_trait]
//! impl Subsystem for AudioEngine {
//!     async fn initialize(&self) -> Result<(), SubsystemError> { Ok(()) }
//!     async fn shutdown(&self) {}
//! }
//! ```

use crate::entities::{SubsystemId, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for subsystem operations.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("[{subsystem}] {kind}: {message}")]
pub struct SubsystemError {
    /// The subsystem that encountered the error.
    pub subsystem: SubsystemId,
    /// Error kind.
    pub kind: SubsystemErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl SubsystemError {
    /// Create a new error.
    pub fn new(subsystem: SubsystemId, kind: SubsystemErrorKind, message: impl Into<String>) -> Self {
        Self {
            subsystem,
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an initialization failure.
    pub fn init_failed(subsystem: SubsystemId, message: impl Into<String>) -> Self {
        Self::new(subsystem, SubsystemErrorKind::InitializationFailed, message)
    }

    /// Shorthand for a "not available" lookup failure.
    pub fn not_ready(subsystem: SubsystemId, message: impl Into<String>) -> Self {
        Self::new(subsystem, SubsystemErrorKind::NotReady, message)
    }
}

/// Categories of subsystem errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsystemErrorKind {
    /// `initialize()` reported failure (or timed out, when a timeout is configured).
    InitializationFailed,
    /// The subsystem exists but is not `Ready`.
    NotReady,
    /// No subsystem registered under this id.
    NotRegistered,
    /// Registration rejected (duplicate id).
    AlreadyRegistered,
    /// A lifecycle edge that is not allowed.
    IllegalLifecycle,
    /// Handle has a different concrete type than requested.
    TypeMismatch,
}

impl fmt::Display for SubsystemErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Self-reported health of a subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Running normally.
    Healthy,
    /// Running with reduced capability.
    Degraded,
    /// Not functioning.
    Unhealthy,
}

impl HealthStatus {
    /// Only `Healthy` counts as healthy; anything else triggers recovery.
    #[must_use]
    pub fn is_healthy(self) -> bool {
        self == HealthStatus::Healthy
    }
}

/// Result of a `health()` probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
}

impl HealthReport {
    /// A healthy report with no message.
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: String::new(),
        }
    }

    /// An unhealthy report.
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: message.into(),
        }
    }

    /// A degraded report.
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            message: message.into(),
        }
    }

    /// Stamp this report with the time it was observed.
    #[must_use]
    pub fn at(self, timestamp: Timestamp) -> HealthSnapshot {
        HealthSnapshot {
            status: self.status,
            message: self.message,
            timestamp,
        }
    }
}

/// A health report as recorded by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub message: String,
    pub timestamp: Timestamp,
}

/// The contract every managed subsystem implements.
#[async_trait]
pub trait Subsystem: Send + Sync {
    /// Bring the subsystem up.
    ///
    /// Called once at boot and again by the recovery controller after a
    /// health failure, so implementations must tolerate re-initialization.
    async fn initialize(&self) -> Result<(), SubsystemError>;

    /// Tear the subsystem down.
    async fn shutdown(&self);

    /// Report current health.
    ///
    /// Default implementation always reports healthy.
    async fn health(&self) -> HealthReport {
        HealthReport::healthy()
    }
}
