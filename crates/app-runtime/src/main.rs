//! # Atrium App Runtime
//!
//! Demo entry point: boots the subsystems in configured order, opens a
//! lesson session, walks through a few scenes, and ticks until Ctrl+C.
//!
//! ## Startup Sequence
//!
//! 1. Install logging (`APP_LOG` filter)
//! 2. Load configuration from the environment
//! 3. Register subsystems and the scene catalog
//! 4. Boot (fail-fast in init order)
//! 5. Tick at a fixed cadence until interrupted
//! 6. End the session and shut down in reverse order

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use app_runtime::adapters::{SaveService, ScriptedSubsystem};
use app_runtime::{AppRuntime, RuntimeConfig, RuntimeDependencies};
use scene_cache::StagedSceneProvider;
use serde_json::json;
use shared_bus::{EventFilter, RuntimeEvent};
use shared_types::{GameState, SubsystemId, SystemTimeSource};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Tick cadence of the demo loop.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Scenes in the demo catalog, visited in order.
const TOUR: [(&str, &str); 3] = [
    ("chemistry_lab", "scenes/chemistry_lab.bundle"),
    ("solar_system", "scenes/solar_system.bundle"),
    ("field_trip", "scenes/field_trip.bundle"),
];

/// Ticks spent in each scene before moving on.
const TICKS_PER_SCENE: u32 = 30;

fn build_runtime(config: RuntimeConfig) -> Result<AppRuntime> {
    let save = Arc::new(SaveService::new());
    let provider = StagedSceneProvider::new(5)
        .with_default_bytes(48 * 1024 * 1024)
        .with_size("solar_system", 160 * 1024 * 1024);
    let deps = RuntimeDependencies::new(Box::new(provider), Arc::new(SystemTimeSource))
        .with_persistence(save.clone());

    let init_order = config.init_order.clone();
    let runtime = AppRuntime::new(config, deps).context("Invalid runtime configuration")?;

    for id in init_order {
        if id == SubsystemId::Save {
            runtime.register_subsystem(id, save.clone())?;
        } else {
            runtime.register_subsystem(id, Arc::new(ScriptedSubsystem::new(id)))?;
        }
    }
    for (scene, locator) in TOUR {
        runtime.register_scene(scene, locator)?;
    }
    Ok(runtime)
}

fn spawn_event_log(runtime: &AppRuntime) {
    let mut events = runtime.subscribe(EventFilter::all());
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                RuntimeEvent::SubsystemFailed { .. }
                | RuntimeEvent::RecoveryExhausted { .. }
                | RuntimeEvent::SceneLoadFailed { .. } => warn!("[Events] {:?}", event),
                other => info!("[Events] {:?}", other),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_env("APP_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;

    info!("===========================================");
    info!("  Atrium App Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let runtime = build_runtime(config)?;
    spawn_event_log(&runtime);

    runtime.boot().await.context("Boot failed")?;
    runtime.registry().print_status();

    let session_config = BTreeMap::from([("course".to_string(), json!("intro-science"))]);
    let session = runtime.start_session("lesson", session_config)?;
    info!("Session {} started. Press Ctrl+C to stop.", session);

    let mut interval = tokio::time::interval(TICK_INTERVAL);
    let mut ticks: u32 = 0;
    let mut stop = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if ticks % TICKS_PER_SCENE == 0 && stop < TOUR.len() {
                    let (scene, _) = TOUR[stop];
                    if let Err(e) = runtime.change_scene(scene) {
                        warn!("Could not enter {}: {}", scene, e);
                    }
                    stop += 1;
                }
                let tick = runtime.tick().await;
                for scene in &tick.cache.completed {
                    if let Err(e) = runtime
                        .record_session_event("scene_loaded", json!({ "scene": scene.as_str() }))
                    {
                        warn!("Could not record scene {}: {}", scene, e);
                    }
                }
                if tick.game_state == GameState::Error {
                    warn!("Runtime entered Error state");
                }
                ticks = ticks.wrapping_add(1);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    runtime.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
