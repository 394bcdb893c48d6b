//! # Adapter Implementations
//!
//! Concrete subsystems that plug into the runtime's ports.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                 OUTER LAYER (Adapters)                     │
//! │        ScriptedSubsystem, SaveService                      │
//! └───────────────────────────────────────────────────────────┘
//!                       ↑ implements ↑
//! ┌───────────────────────────────────────────────────────────┐
//! │                      PORTS                                 │
//! │        trait Subsystem, trait PersistenceStore             │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! The demo binary wires these in place of the real engine services.

pub mod save;
pub mod scripted;

pub use save::SaveService;
pub use scripted::ScriptedSubsystem;
