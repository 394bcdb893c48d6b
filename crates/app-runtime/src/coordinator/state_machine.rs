//! # Game State Machine
//!
//! Current global state, a bounded history ring, and the simulation clock
//! that stops while the game is paused.

use std::collections::VecDeque;

use shared_types::{GameState, Timestamp, TransitionError};

/// Simulation time that does not advance while paused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationClock {
    started_at: Timestamp,
    paused_since: Option<Timestamp>,
    paused_total: u64,
}

impl SimulationClock {
    pub fn new(started_at: Timestamp) -> Self {
        Self {
            started_at,
            paused_since: None,
            paused_total: 0,
        }
    }

    pub fn pause(&mut self, now: Timestamp) {
        if self.paused_since.is_none() {
            self.paused_since = Some(now);
        }
    }

    pub fn resume(&mut self, now: Timestamp) {
        if let Some(since) = self.paused_since.take() {
            self.paused_total += now.saturating_sub(since);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_since.is_some()
    }

    /// Unpaused milliseconds since `started_at`.
    pub fn elapsed(&self, now: Timestamp) -> u64 {
        let end = self.paused_since.unwrap_or(now);
        end.saturating_sub(self.started_at)
            .saturating_sub(self.paused_total)
    }
}

/// Global state plus history.
#[derive(Debug, Clone)]
pub struct GameStateMachine {
    current: GameState,
    history: VecDeque<GameState>,
    capacity: usize,
    clock: SimulationClock,
}

impl GameStateMachine {
    /// Start in `Initializing`.
    pub fn new(history_capacity: usize, now: Timestamp) -> Self {
        Self {
            current: GameState::Initializing,
            history: VecDeque::with_capacity(history_capacity),
            capacity: history_capacity.max(1),
            clock: SimulationClock::new(now),
        }
    }

    pub fn current(&self) -> GameState {
        self.current
    }

    /// Most recent prior state.
    pub fn previous(&self) -> Option<GameState> {
        self.history.back().copied()
    }

    /// Prior states, oldest first.
    pub fn history(&self) -> Vec<GameState> {
        self.history.iter().copied().collect()
    }

    /// Check `current -> next` against the adjacency table.
    ///
    /// Staying in the same state is never an edge.
    pub fn check(&self, next: GameState) -> Result<(), TransitionError> {
        if self.current == next || !self.current.can_transition_to(next) {
            return Err(TransitionError::InvalidTransition {
                from: self.current,
                to: next,
            });
        }
        Ok(())
    }

    /// Apply a transition without checking it, running exit/enter hooks.
    ///
    /// Returns the state that was left.
    pub fn apply(&mut self, next: GameState, now: Timestamp) -> GameState {
        let from = self.current;

        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(from);
        self.current = next;

        if from == GameState::Paused && next != GameState::Paused {
            self.clock.resume(now);
        }
        if next == GameState::Paused {
            self.clock.pause(now);
        }
        from
    }

    pub fn is_simulation_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn simulation_time(&self, now: Timestamp) -> u64 {
        self.clock.elapsed(now)
    }
}
