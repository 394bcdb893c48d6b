//! # Test Fixtures
//!
//! Builds an `AppRuntime` with scripted subsystems, a `SaveService` as the
//! persistence collaborator, and a manual clock.

use std::collections::HashMap;
use std::sync::Arc;

use app_runtime::adapters::{SaveService, ScriptedSubsystem};
use app_runtime::{AppRuntime, RuntimeConfig, RuntimeDependencies, RuntimeTick};
use scene_cache::StagedSceneProvider;
use shared_types::{ManualClock, SubsystemId};

/// Clock value when a fixture is created.
pub const START_MS: u64 = 1_000;

/// Clock step of `Fixture::frame`.
pub const FRAME_MS: u64 = 16;

pub struct Fixture {
    pub runtime: AppRuntime,
    pub clock: Arc<ManualClock>,
    pub save: Arc<SaveService>,
    scripted: HashMap<SubsystemId, Arc<ScriptedSubsystem>>,
}

impl Fixture {
    /// Runtime whose init order is `subsystems` followed by `Save`.
    pub fn new(
        mut config: RuntimeConfig,
        provider: StagedSceneProvider,
        subsystems: Vec<ScriptedSubsystem>,
        scenes: &[&str],
    ) -> Self {
        let clock = Arc::new(ManualClock::new(START_MS));
        let save = Arc::new(SaveService::new());

        config.init_order = subsystems.iter().map(ScriptedSubsystem::id).collect();
        config.init_order.push(SubsystemId::Save);

        let deps = RuntimeDependencies::new(Box::new(provider), clock.clone())
            .with_persistence(save.clone());
        let runtime = AppRuntime::new(config, deps).unwrap();

        let mut scripted = HashMap::new();
        for subsystem in subsystems {
            let id = subsystem.id();
            let subsystem = Arc::new(subsystem);
            runtime.register_subsystem(id, subsystem.clone()).unwrap();
            scripted.insert(id, subsystem);
        }
        runtime
            .register_subsystem(SubsystemId::Save, save.clone())
            .unwrap();

        for scene in scenes {
            runtime
                .register_scene(*scene, format!("scenes/{scene}"))
                .unwrap();
        }

        Self {
            runtime,
            clock,
            save,
            scripted,
        }
    }

    /// Healthy Config, Assets, Audio plus the given scenes.
    pub fn standard(provider: StagedSceneProvider, scenes: &[&str]) -> Self {
        Self::new(
            RuntimeConfig::default(),
            provider,
            vec![
                ScriptedSubsystem::new(SubsystemId::Config),
                ScriptedSubsystem::new(SubsystemId::Assets),
                ScriptedSubsystem::new(SubsystemId::Audio),
            ],
            scenes,
        )
    }

    pub fn scripted(&self, id: SubsystemId) -> &Arc<ScriptedSubsystem> {
        &self.scripted[&id]
    }

    /// Advance one frame and tick.
    pub async fn frame(&self) -> RuntimeTick {
        self.clock.advance(FRAME_MS);
        self.runtime.tick().await
    }

    /// Tick frames until no scene change is pending.
    pub async fn settle(&self) {
        for _ in 0..100 {
            if self.runtime.pending_scene_change().is_none() {
                return;
            }
            self.frame().await;
        }
    }

    /// Advance past the health interval and tick once.
    pub async fn next_sweep(&self) -> RuntimeTick {
        self.clock
            .advance(self.runtime.config().health.interval_ms);
        self.runtime.tick().await
    }
}
