//! # Runtime Events
//!
//! Every notification the runtime emits. Each kind is an explicit variant,
//! so subscribers match on types instead of string topics.

use serde::{Deserialize, Serialize};
use shared_types::{GameState, HealthStatus, SceneId, SubsystemId};

/// Why a cached scene left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionReason {
    /// Caller asked for it via `unload`.
    Explicit,
    /// Aggregate memory estimate exceeded the threshold.
    MemoryPressure,
    /// Entry count exceeded the configured maximum.
    EntryLimit,
}

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuntimeEvent {
    // =========================================================================
    // LIFECYCLE COORDINATOR
    // =========================================================================
    /// The global state machine moved.
    GameStateChanged {
        from: GameState,
        to: GameState,
        /// True when the adjacency table was bypassed.
        forced: bool,
    },

    // =========================================================================
    // SUBSYSTEMS
    // =========================================================================
    /// A subsystem finished `initialize()` successfully at boot.
    SubsystemReady { subsystem: SubsystemId },

    /// A subsystem failed, either at boot or during a health sweep.
    SubsystemFailed {
        subsystem: SubsystemId,
        message: String,
        /// True when the failure happened during boot.
        during_startup: bool,
    },

    /// The health sweep observed a non-healthy report.
    HealthDegraded {
        subsystem: SubsystemId,
        status: HealthStatus,
        message: String,
    },

    /// Recovery brought a subsystem back to `Ready`.
    SubsystemRecovered { subsystem: SubsystemId, attempts: u32 },

    /// Recovery gave up on a subsystem for good.
    RecoveryExhausted { subsystem: SubsystemId, attempts: u32 },

    // =========================================================================
    // SESSIONS
    // =========================================================================
    /// A usage session started.
    SessionStarted {
        session_id: String,
        session_type: String,
    },

    /// A usage session ended.
    SessionEnded {
        session_id: String,
        duration_ms: u64,
        persisted: bool,
    },

    // =========================================================================
    // SCENE CACHE
    // =========================================================================
    /// A queued load task was admitted and started.
    SceneLoadStarted { scene_id: SceneId, priority: i32 },

    /// A running load reported progress.
    SceneLoadProgress {
        scene_id: SceneId,
        progress: f32,
        stage: String,
    },

    /// A load finished.
    SceneLoadCompleted {
        scene_id: SceneId,
        elapsed_ms: u64,
        bytes: u64,
    },

    /// A load failed. Not retried automatically.
    SceneLoadFailed { scene_id: SceneId, reason: String },

    /// A scene left the cache.
    SceneEvicted {
        scene_id: SceneId,
        bytes: u64,
        reason: EvictionReason,
    },

    /// The foreground scene changed.
    SceneActivated {
        scene_id: SceneId,
        previous: Option<SceneId>,
    },
}

impl RuntimeEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::GameStateChanged { .. } => EventTopic::Lifecycle,
            Self::SubsystemReady { .. }
            | Self::SubsystemFailed { .. }
            | Self::HealthDegraded { .. }
            | Self::SubsystemRecovered { .. }
            | Self::RecoveryExhausted { .. } => EventTopic::Subsystem,
            Self::SessionStarted { .. } | Self::SessionEnded { .. } => EventTopic::Session,
            Self::SceneLoadStarted { .. }
            | Self::SceneLoadProgress { .. }
            | Self::SceneLoadCompleted { .. }
            | Self::SceneLoadFailed { .. }
            | Self::SceneEvicted { .. }
            | Self::SceneActivated { .. } => EventTopic::Scene,
        }
    }

    /// Get the subsystem this event concerns, if any.
    #[must_use]
    pub fn subsystem(&self) -> Option<SubsystemId> {
        match self {
            Self::SubsystemReady { subsystem }
            | Self::SubsystemFailed { subsystem, .. }
            | Self::HealthDegraded { subsystem, .. }
            | Self::SubsystemRecovered { subsystem, .. }
            | Self::RecoveryExhausted { subsystem, .. } => Some(*subsystem),
            Self::SessionStarted { .. } | Self::SessionEnded { .. } => None,
            Self::GameStateChanged { .. } => None,
            _ => Some(SubsystemId::Scenes),
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Global state machine.
    Lifecycle,
    /// Subsystem boot, health and recovery.
    Subsystem,
    /// Usage sessions.
    Session,
    /// Scene loading, eviction and activation.
    Scene,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Subsystems to include. Empty means all sources.
    pub subsystems: Vec<SubsystemId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            subsystems: Vec::new(),
        }
    }

    /// Create a filter for events concerning specific subsystems.
    #[must_use]
    pub fn from_subsystems(subsystems: Vec<SubsystemId>) -> Self {
        Self {
            topics: Vec::new(),
            subsystems,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &RuntimeEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.subsystems.is_empty()
            || event
                .subsystem()
                .is_some_and(|id| self.subsystems.contains(&id));

        topic_match && source_match
    }
}
