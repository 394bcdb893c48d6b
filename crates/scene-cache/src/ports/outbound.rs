//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the scene cache requires from the host application.
//!
//! Decoding and instantiating scene content belongs to the rendering/asset
//! layer; the cache only needs a size estimate and a cooperative poll.

use crate::domain::entities::ResourceHandle;
use shared_types::SceneId;
use std::collections::HashMap;

/// Result of polling a running load.
#[derive(Debug, Clone)]
pub enum LoadPoll {
    /// Still running.
    Pending { progress: f32, stage: String },
    /// Finished; the cache takes ownership of the handle.
    Ready { handle: ResourceHandle, bytes: u64 },
    /// Failed; the task ends in `Error`.
    Failed { reason: String },
}

/// Abstract interface to the asset layer.
///
/// Production: the Assets subsystem's streaming loader.
/// Testing: `StagedSceneProvider` (below).
///
/// Every method must return promptly; a load that needs more time reports
/// `Pending` and is polled again on the next tick.
pub trait SceneResourceProvider: Send {
    /// Approximate footprint of a scene before it is loaded.
    fn estimate(&self, scene_id: &SceneId, locator: &str) -> u64;

    /// A task for `scene_id` was admitted. An `Err` fails the task at once.
    fn begin_load(&mut self, _scene_id: &SceneId, _locator: &str) -> Result<(), String> {
        Ok(())
    }

    /// Advance a running load.
    fn poll_load(&mut self, scene_id: &SceneId, locator: &str) -> LoadPoll;

    /// A cached scene left the cache; release what the handle refers to.
    fn release(&mut self, _scene_id: &SceneId, _handle: ResourceHandle) {}
}

/// Stage labels reported by `StagedSceneProvider`, in order.
pub const LOAD_STAGES: [&str; 3] = ["resolving", "streaming", "instantiating"];

/// Provider that completes every load after a fixed number of polls.
///
/// Sizes and failures are configured per scene. Used by tests and by the
/// demo binary in place of a real asset streamer.
#[derive(Debug)]
pub struct StagedSceneProvider {
    polls_to_complete: u32,
    default_bytes: u64,
    sizes: HashMap<SceneId, u64>,
    /// Scene -> (reason, remaining failures; `None` = forever).
    failures: HashMap<SceneId, (String, Option<u32>)>,
    in_flight: HashMap<SceneId, u32>,
    released: Vec<SceneId>,
}

impl StagedSceneProvider {
    /// Loads finish on the `polls_to_complete`-th poll (at least one).
    pub fn new(polls_to_complete: u32) -> Self {
        Self {
            polls_to_complete: polls_to_complete.max(1),
            default_bytes: 64 * 1024 * 1024,
            sizes: HashMap::new(),
            failures: HashMap::new(),
            in_flight: HashMap::new(),
            released: Vec::new(),
        }
    }

    /// Footprint for scenes without an explicit size.
    pub fn with_default_bytes(mut self, bytes: u64) -> Self {
        self.default_bytes = bytes;
        self
    }

    /// Footprint of one scene.
    pub fn with_size(mut self, scene_id: impl Into<SceneId>, bytes: u64) -> Self {
        self.sizes.insert(scene_id.into(), bytes);
        self
    }

    /// Make every load of `scene_id` fail.
    pub fn failing(mut self, scene_id: impl Into<SceneId>, reason: impl Into<String>) -> Self {
        self.failures.insert(scene_id.into(), (reason.into(), None));
        self
    }

    /// Make the next `times` loads of `scene_id` fail.
    pub fn failing_times(
        mut self,
        scene_id: impl Into<SceneId>,
        reason: impl Into<String>,
        times: u32,
    ) -> Self {
        self.failures
            .insert(scene_id.into(), (reason.into(), Some(times)));
        self
    }

    /// Scenes released so far, in order.
    pub fn released(&self) -> &[SceneId] {
        &self.released
    }

    fn bytes_for(&self, scene_id: &SceneId) -> u64 {
        self.sizes
            .get(scene_id)
            .copied()
            .unwrap_or(self.default_bytes)
    }

    fn take_failure(&mut self, scene_id: &SceneId) -> Option<String> {
        let (reason, remaining) = self.failures.get_mut(scene_id)?;
        match remaining {
            None => Some(reason.clone()),
            Some(0) => None,
            Some(n) => {
                *n -= 1;
                Some(reason.clone())
            }
        }
    }
}

impl SceneResourceProvider for StagedSceneProvider {
    fn estimate(&self, scene_id: &SceneId, _locator: &str) -> u64 {
        self.bytes_for(scene_id)
    }

    fn begin_load(&mut self, scene_id: &SceneId, _locator: &str) -> Result<(), String> {
        self.in_flight.insert(scene_id.clone(), 0);
        Ok(())
    }

    fn poll_load(&mut self, scene_id: &SceneId, locator: &str) -> LoadPoll {
        if let Some(reason) = self.take_failure(scene_id) {
            self.in_flight.remove(scene_id);
            return LoadPoll::Failed { reason };
        }

        let polls = self.in_flight.entry(scene_id.clone()).or_insert(0);
        *polls += 1;
        let done = *polls;

        if done >= self.polls_to_complete {
            self.in_flight.remove(scene_id);
            return LoadPoll::Ready {
                handle: ResourceHandle::new(locator.to_string()),
                bytes: self.bytes_for(scene_id),
            };
        }

        let progress = done as f32 / self.polls_to_complete as f32;
        let stage_index = ((progress * LOAD_STAGES.len() as f32) as usize).min(LOAD_STAGES.len() - 1);
        LoadPoll::Pending {
            progress,
            stage: LOAD_STAGES[stage_index].to_string(),
        }
    }

    fn release(&mut self, scene_id: &SceneId, _handle: ResourceHandle) {
        self.released.push(scene_id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completes_after_configured_polls() {
        let mut provider = StagedSceneProvider::new(3).with_size("lab", 1_000);
        let lab = SceneId::new("lab");
        provider.begin_load(&lab, "scenes/lab").unwrap();

        assert!(matches!(provider.poll_load(&lab, "scenes/lab"), LoadPoll::Pending { .. }));
        assert!(matches!(provider.poll_load(&lab, "scenes/lab"), LoadPoll::Pending { .. }));
        match provider.poll_load(&lab, "scenes/lab") {
            LoadPoll::Ready { handle, bytes } => {
                assert_eq!(bytes, 1_000);
                assert_eq!(handle.downcast_ref::<String>().unwrap(), "scenes/lab");
            }
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[test]
    fn test_failing_times_then_succeeds() {
        let mut provider = StagedSceneProvider::new(1).failing_times("lab", "corrupt bundle", 1);
        let lab = SceneId::new("lab");

        assert!(matches!(
            provider.poll_load(&lab, "scenes/lab"),
            LoadPoll::Failed { ref reason } if reason == "corrupt bundle"
        ));
        assert!(matches!(provider.poll_load(&lab, "scenes/lab"), LoadPoll::Ready { .. }));
    }

    #[test]
    fn test_estimate_uses_default() {
        let provider = StagedSceneProvider::new(1).with_default_bytes(42);
        assert_eq!(provider.estimate(&SceneId::new("any"), "x"), 42);
    }
}
