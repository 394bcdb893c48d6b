//! # State Preservation
//!
//! Per-scene snapshots captured when a scene leaves the foreground and
//! reapplied when it comes back, plus the global map that survives every
//! swap.
//!
//! ## Round-trip law
//!
//! `preserve(A)` followed by any number of swaps and then `restore(A)` hands
//! each participant exactly the value it produced at capture time. Restoring
//! never modifies the stored snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{SceneId, Timestamp};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Which sub-map of a snapshot a participant writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateCategory {
    /// Characters and other actors.
    Actor,
    /// Scene-local flags and objects.
    Scene,
    /// Open panels, scroll positions.
    Interface,
    /// Pluggable domain context (lesson progress, dialogue position, ...).
    Context,
}

/// A component whose state is captured and restored around scene swaps.
pub trait StateParticipant: Send + Sync {
    /// Key under which this participant's state is stored.
    fn key(&self) -> &str;

    /// Sub-map this participant belongs to.
    fn category(&self) -> StateCategory;

    /// Capture state for `scene_id`. `None` stores nothing.
    fn capture(&self, scene_id: &SceneId) -> Option<Value>;

    /// Reapply previously captured state.
    fn restore(&self, scene_id: &SceneId, state: &Value);
}

/// Captured state of one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub scene_id: SceneId,
    pub timestamp: Timestamp,
    pub actor_state: BTreeMap<String, Value>,
    pub scene_state: BTreeMap<String, Value>,
    pub interface_state: BTreeMap<String, Value>,
    pub context_state: BTreeMap<String, Value>,
}

impl StateSnapshot {
    /// Empty snapshot.
    pub fn new(scene_id: SceneId, timestamp: Timestamp) -> Self {
        Self {
            scene_id,
            timestamp,
            actor_state: BTreeMap::new(),
            scene_state: BTreeMap::new(),
            interface_state: BTreeMap::new(),
            context_state: BTreeMap::new(),
        }
    }

    /// Sub-map for a category.
    #[must_use]
    pub fn section(&self, category: StateCategory) -> &BTreeMap<String, Value> {
        match category {
            StateCategory::Actor => &self.actor_state,
            StateCategory::Scene => &self.scene_state,
            StateCategory::Interface => &self.interface_state,
            StateCategory::Context => &self.context_state,
        }
    }

    /// Mutable sub-map for a category.
    pub fn section_mut(&mut self, category: StateCategory) -> &mut BTreeMap<String, Value> {
        match category {
            StateCategory::Actor => &mut self.actor_state,
            StateCategory::Scene => &mut self.scene_state,
            StateCategory::Interface => &mut self.interface_state,
            StateCategory::Context => &mut self.context_state,
        }
    }

    /// Total number of captured entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actor_state.len()
            + self.scene_state.len()
            + self.interface_state.len()
            + self.context_state.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Free-form key/value state that outlives scene swaps.
///
/// Cleared only by an explicit call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalState {
    values: BTreeMap<String, Value>,
}

impl GlobalState {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Snapshot store plus registered participants.
#[derive(Default)]
pub struct StatePreservationStore {
    snapshots: HashMap<SceneId, StateSnapshot>,
    participants: Vec<Arc<dyn StateParticipant>>,
    global: GlobalState,
}

impl StatePreservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant. Capture and restore follow registration order.
    pub fn register_participant(&mut self, participant: Arc<dyn StateParticipant>) {
        self.participants.push(participant);
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Capture every participant for `scene_id`, replacing any prior snapshot.
    pub fn preserve(&mut self, scene_id: &SceneId, now: Timestamp) -> &StateSnapshot {
        let mut snapshot = StateSnapshot::new(scene_id.clone(), now);
        for participant in &self.participants {
            if let Some(value) = participant.capture(scene_id) {
                snapshot
                    .section_mut(participant.category())
                    .insert(participant.key().to_string(), value);
            }
        }
        debug!(scene = %scene_id, entries = snapshot.len(), "[SceneCache] State preserved");
        self.snapshots.insert(scene_id.clone(), snapshot);
        &self.snapshots[scene_id]
    }

    /// Reapply the stored snapshot for `scene_id`.
    ///
    /// Returns `false` (participants keep their defaults) when no snapshot
    /// exists.
    pub fn restore(&self, scene_id: &SceneId) -> bool {
        let Some(snapshot) = self.snapshots.get(scene_id) else {
            return false;
        };
        for participant in &self.participants {
            if let Some(value) = snapshot.section(participant.category()).get(participant.key()) {
                participant.restore(scene_id, value);
            }
        }
        debug!(scene = %scene_id, entries = snapshot.len(), "[SceneCache] State restored");
        true
    }

    pub fn snapshot(&self, scene_id: &SceneId) -> Option<&StateSnapshot> {
        self.snapshots.get(scene_id)
    }

    /// Insert a snapshot obtained elsewhere (e.g. from persistence).
    pub fn insert(&mut self, snapshot: StateSnapshot) {
        self.snapshots.insert(snapshot.scene_id.clone(), snapshot);
    }

    pub fn remove(&mut self, scene_id: &SceneId) -> Option<StateSnapshot> {
        self.snapshots.remove(scene_id)
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn global(&self) -> &GlobalState {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut GlobalState {
        &mut self.global
    }
}
