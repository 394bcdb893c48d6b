//! # Runtime Configuration
//!
//! Unified configuration for the coordinator, recovery, and scene cache.
//!
//! All values have defaults and can be overridden from the environment:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `APP_INIT_ORDER` | `init_order` (comma separated names) | Config, Save, Localization, Assets, Audio, Input, UI, Scenes, Content |
//! | `APP_INIT_TIMEOUT_MS` | `init_timeout_ms` | none |
//! | `APP_HEALTH_INTERVAL_MS` | `health.interval_ms` | 5000 |
//! | `APP_MAX_RECOVERY_ATTEMPTS` | `health.max_recovery_attempts` | 3 |
//! | `APP_SCENE_CONCURRENCY` | `scene_cache.concurrency_cap` | 2 |
//! | `APP_SCENE_MAX_ENTRIES` | `scene_cache.max_entries` | 8 |
//! | `APP_SCENE_MAX_MEMORY_BYTES` | `scene_cache.max_memory_bytes` | 512 MiB |
//! | `APP_SCENE_LOAD_TIMEOUT_MS` | `scene_cache.load_timeout_ms` | none |

use std::str::FromStr;

use scene_cache::SceneCacheConfig;
use serde::{Deserialize, Serialize};
use shared_types::SubsystemId;
use thiserror::Error;

/// Default capacity of the game-state history ring.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Subsystem initialization order. Shutdown runs in reverse.
    pub init_order: Vec<SubsystemId>,
    /// Per-subsystem `initialize()` timeout. `None` waits indefinitely.
    pub init_timeout_ms: Option<u64>,
    /// Capacity of the game-state history ring.
    pub history_capacity: usize,
    /// Health sweep and recovery.
    pub health: HealthConfig,
    /// Scene cache limits.
    pub scene_cache: SceneCacheConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            init_order: SubsystemId::default_init_order(),
            init_timeout_ms: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            health: HealthConfig::default(),
            scene_cache: SceneCacheConfig::default(),
        }
    }
}

/// Health sweep configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Milliseconds between health sweeps.
    pub interval_ms: u64,
    /// Recovery attempts before giving up on a subsystem.
    pub max_recovery_attempts: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            max_recovery_attempts: 3,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    /// `APP_INIT_ORDER` names a subsystem that does not exist.
    #[error("unknown subsystem in init order: {0}")]
    UnknownSubsystem(String),

    /// A subsystem appears twice in the init order.
    #[error("subsystem listed twice in init order: {0}")]
    DuplicateSubsystem(SubsystemId),

    /// A limit that must be positive is zero.
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

impl RuntimeConfig {
    /// Defaults overridden by `APP_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(order) = lookup("APP_INIT_ORDER") {
            config.init_order = parse_init_order(&order)?;
        }
        if let Some(value) = lookup("APP_INIT_TIMEOUT_MS") {
            config.init_timeout_ms = Some(parse_var("APP_INIT_TIMEOUT_MS", &value)?);
        }
        if let Some(value) = lookup("APP_HEALTH_INTERVAL_MS") {
            config.health.interval_ms = parse_var("APP_HEALTH_INTERVAL_MS", &value)?;
        }
        if let Some(value) = lookup("APP_MAX_RECOVERY_ATTEMPTS") {
            config.health.max_recovery_attempts = parse_var("APP_MAX_RECOVERY_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("APP_SCENE_CONCURRENCY") {
            config.scene_cache.concurrency_cap = parse_var("APP_SCENE_CONCURRENCY", &value)?;
        }
        if let Some(value) = lookup("APP_SCENE_MAX_ENTRIES") {
            config.scene_cache.max_entries = parse_var("APP_SCENE_MAX_ENTRIES", &value)?;
        }
        if let Some(value) = lookup("APP_SCENE_MAX_MEMORY_BYTES") {
            config.scene_cache.max_memory_bytes = parse_var("APP_SCENE_MAX_MEMORY_BYTES", &value)?;
        }
        if let Some(value) = lookup("APP_SCENE_LOAD_TIMEOUT_MS") {
            config.scene_cache.load_timeout_ms =
                Some(parse_var("APP_SCENE_LOAD_TIMEOUT_MS", &value)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check limits and the init order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.health.interval_ms == 0 {
            return Err(ConfigError::ZeroLimit("health.interval_ms"));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroLimit("history_capacity"));
        }
        if self.scene_cache.concurrency_cap == 0 {
            return Err(ConfigError::ZeroLimit("scene_cache.concurrency_cap"));
        }
        if self.scene_cache.max_entries == 0 {
            return Err(ConfigError::ZeroLimit("scene_cache.max_entries"));
        }

        let mut seen = Vec::with_capacity(self.init_order.len());
        for id in &self.init_order {
            if seen.contains(id) {
                return Err(ConfigError::DuplicateSubsystem(*id));
            }
            seen.push(*id);
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

fn parse_init_order(value: &str) -> Result<Vec<SubsystemId>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            SubsystemId::from_name(name).ok_or_else(|| ConfigError::UnknownSubsystem(name.to_string()))
        })
        .collect()
}
