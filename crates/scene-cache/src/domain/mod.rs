//! # Domain Layer
//!
//! Pure cache logic: entities, queue ordering, eviction choice, and state
//! preservation. No I/O, no clocks; callers pass timestamps in.

pub mod config;
pub mod entities;
pub mod errors;
pub mod eviction;
pub mod queue;
pub mod snapshot;
