//! # Eviction Policy
//!
//! Victim selection for the memory/entry limits. Pure functions over the
//! scene catalog; the service applies the result.

use super::config::SceneCacheConfig;
use super::entities::{SceneDescriptor, SceneLoadingState};
use shared_bus::EvictionReason;
use shared_types::SceneId;

/// Which limit is currently exceeded, if any.
///
/// Memory pressure is reported ahead of the entry limit when both apply.
#[must_use]
pub fn limit_exceeded(
    config: &SceneCacheConfig,
    memory_estimate: u64,
    cached_count: usize,
) -> Option<EvictionReason> {
    if memory_estimate > config.max_memory_bytes {
        Some(EvictionReason::MemoryPressure)
    } else if cached_count > config.max_entries {
        Some(EvictionReason::EntryLimit)
    } else {
        None
    }
}

/// Pick the least-recently-activated cached scene that is not `Active`.
///
/// Scenes never activated count from their load time. Ties go to the lower
/// id so the choice is deterministic.
pub fn select_victim<'a>(scenes: impl IntoIterator<Item = &'a SceneDescriptor>) -> Option<SceneId> {
    scenes
        .into_iter()
        .filter(|s| s.state == SceneLoadingState::Loaded)
        .min_by(|a, b| a.recency().cmp(&b.recency()).then_with(|| a.id.cmp(&b.id)))
        .map(|s| s.id.clone())
}
