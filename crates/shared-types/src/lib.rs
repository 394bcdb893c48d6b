//! # Shared Types Crate
//!
//! Domain entities and ports shared by every Atrium crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: subsystem ids, lifecycle states, and the
//!   global state table are defined once, here.
//! - **Closed tag set**: subsystems are addressed by `SubsystemId`, never by
//!   free-form string lookups.
//! - **Ports, not globals**: time and persistence are traits injected at
//!   construction.

pub mod entities;
pub mod errors;
pub mod persistence;
pub mod subsystem_trait;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use persistence::{InMemoryStore, PersistenceError, PersistenceStore};
pub use subsystem_trait::{
    HealthReport, HealthSnapshot, HealthStatus, Subsystem, SubsystemError, SubsystemErrorKind,
};
pub use time::{ManualClock, SystemTimeSource, TimeSource};
