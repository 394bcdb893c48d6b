//! # Error Types
//!
//! Errors shared by the coordinator and its callers.

use crate::entities::GameState;
use thiserror::Error;

/// Errors from the global state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The edge is not present in the adjacency table.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: GameState, to: GameState },
}
