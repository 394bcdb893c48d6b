//! # App Runtime Library
//!
//! Boots and supervises every subsystem, drives the global game state,
//! owns the usage session, and ticks the scene cache. The binary in
//! `main.rs` wires the demo services; tests drive `AppRuntime` directly.
//!
//! ## Architectural Patterns
//!
//! - **Typed registry**: subsystems are addressed by `SubsystemId` and only
//!   handed out while `Ready`
//! - **Event-driven**: every state change is published on the shared bus
//! - **Hexagonal Architecture**: time, persistence, and scene loading are
//!   ports injected at construction
//!
//! ## Module Map
//!
//! - `registry/` - Subsystem Registry (lifecycle state per subsystem)
//! - `coordinator/` - Lifecycle Coordinator (boot, game state, health sweep)
//! - `recovery/` - Recovery Controller (bounded re-initialization)
//! - `session/` - Session Manager
//! - `container/` - Configuration and injected collaborators
//! - `adapters/` - Concrete subsystems used by the demo binary
//! - `runtime` - `AppRuntime` façade and tick loop

#![allow(clippy::module_name_repetitions)]

pub mod adapters;
pub mod container;
pub mod coordinator;
pub mod recovery;
pub mod registry;
pub mod runtime;
pub mod session;

pub use container::{ConfigError, HealthConfig, RuntimeConfig, RuntimeDependencies};
pub use coordinator::{LifecycleCoordinator, StartupError, SweepReport};
pub use recovery::{RecoveryController, RecoveryOutcome};
pub use registry::{FailureOrigin, SubsystemDescriptor, SubsystemRegistry};
pub use runtime::{AppRuntime, RuntimeError, RuntimeTick};
pub use session::{Session, SessionError, SessionEvent, SessionManager, SessionRecord};
