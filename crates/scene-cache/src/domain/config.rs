//! # Cache Configuration

use serde::{Deserialize, Serialize};

/// Configuration for the scene cache.
///
/// - `concurrency_cap`: loads allowed to run at once (default: 2)
/// - `max_entries`: cached scenes before eviction (default: 8)
/// - `max_memory_bytes`: aggregate footprint before eviction (default: 512 MiB)
/// - `load_timeout_ms`: `None` means loads may run forever, which is the
///   default. Set it to fail loads that exceed the budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneCacheConfig {
    pub concurrency_cap: usize,
    pub max_entries: usize,
    pub max_memory_bytes: u64,
    pub load_timeout_ms: Option<u64>,
}

impl Default for SceneCacheConfig {
    fn default() -> Self {
        Self {
            concurrency_cap: 2,
            max_entries: 8,
            max_memory_bytes: 512 * 1024 * 1024,
            load_timeout_ms: None,
        }
    }
}
