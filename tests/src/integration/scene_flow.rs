//! # Scene Flow Scenarios
//!
//! Scene changes driven through `AppRuntime`: foreground priority, the
//! eviction policy, and state carried across swaps.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::integration::fixtures::Fixture;
    use app_runtime::adapters::ScriptedSubsystem;
    use app_runtime::RuntimeConfig;
    use parking_lot::Mutex;
    use scene_cache::{
        LoadProgress, LoadRequest, SceneLoadingState, StagedSceneProvider, StateCategory,
        StateParticipant, SwapOutcome, FOREGROUND_PRIORITY, SNAPSHOT_KEY_PREFIX,
    };
    use serde_json::{json, Value};
    use shared_bus::{EventFilter, EventTopic, EvictionReason, RuntimeEvent};
    use shared_types::{GameState, SceneId, SubsystemId};

    /// Lesson progress shared by whichever scene is in the foreground.
    struct LessonProgress {
        current: Mutex<Value>,
    }

    impl LessonProgress {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                current: Mutex::new(Value::Null),
            })
        }

        fn set(&self, value: Value) {
            *self.current.lock() = value;
        }

        fn get(&self) -> Value {
            self.current.lock().clone()
        }
    }

    impl StateParticipant for LessonProgress {
        fn key(&self) -> &str {
            "lesson"
        }

        fn category(&self) -> StateCategory {
            StateCategory::Context
        }

        fn capture(&self, _scene_id: &SceneId) -> Option<Value> {
            Some(self.get())
        }

        fn restore(&self, _scene_id: &SceneId, state: &Value) {
            self.set(state.clone());
        }
    }

    fn fixture(config: RuntimeConfig, provider: StagedSceneProvider, scenes: &[&str]) -> Fixture {
        Fixture::new(
            config,
            provider,
            vec![
                ScriptedSubsystem::new(SubsystemId::Config),
                ScriptedSubsystem::new(SubsystemId::Assets),
            ],
            scenes,
        )
    }

    fn id(scene: &str) -> SceneId {
        SceneId::new(scene)
    }

    #[tokio::test]
    async fn test_foreground_load_jumps_background_queue() {
        let mut config = RuntimeConfig::default();
        config.scene_cache.concurrency_cap = 1;
        let f = fixture(config, StagedSceneProvider::new(2), &["bg1", "bg2", "lab"]);
        f.runtime.boot().await.unwrap();
        let mut scene_events = f
            .runtime
            .subscribe(EventFilter::topics(vec![EventTopic::Scene]));

        {
            let mut scenes = f.runtime.scenes();
            scenes.load_async(&id("bg1"), LoadRequest::default()).unwrap();
            scenes.load_async(&id("bg2"), LoadRequest::default()).unwrap();
        }
        assert_eq!(f.runtime.change_scene("lab").unwrap(), SwapOutcome::Pending);
        assert_eq!(
            f.runtime.scenes().get_progress(&id("lab")),
            LoadProgress::Queued {
                priority: FOREGROUND_PRIORITY
            }
        );

        f.settle().await;
        for _ in 0..10 {
            f.frame().await;
        }

        let started: Vec<SceneId> = scene_events
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                RuntimeEvent::SceneLoadStarted { scene_id, .. } => Some(scene_id),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec![id("lab"), id("bg1"), id("bg2")]);
        assert_eq!(f.runtime.game_state(), GameState::Playing);
    }

    #[tokio::test]
    async fn test_entry_limit_evicts_least_recently_activated() {
        let mut config = RuntimeConfig::default();
        config.scene_cache.max_entries = 2;
        let f = fixture(config, StagedSceneProvider::new(1), &["a", "b", "c"]);
        f.runtime.boot().await.unwrap();
        let mut scene_events = f
            .runtime
            .subscribe(EventFilter::topics(vec![EventTopic::Scene]));

        for scene in ["a", "b", "c"] {
            f.runtime.change_scene(scene).unwrap();
            f.settle().await;
        }

        let scenes = f.runtime.scenes();
        assert_eq!(scenes.scene(&id("a")).unwrap().state, SceneLoadingState::NotLoaded);
        assert_eq!(scenes.scene(&id("b")).unwrap().state, SceneLoadingState::Loaded);
        assert_eq!(scenes.scene(&id("c")).unwrap().state, SceneLoadingState::Active);
        assert_eq!(scenes.cached_count(), 2);
        drop(scenes);

        let evictions: Vec<_> = scene_events
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                RuntimeEvent::SceneEvicted {
                    scene_id, reason, ..
                } => Some((scene_id, reason)),
                _ => None,
            })
            .collect();
        assert_eq!(evictions, vec![(id("a"), EvictionReason::EntryLimit)]);
    }

    #[tokio::test]
    async fn test_active_scene_survives_memory_pressure() {
        let mut config = RuntimeConfig::default();
        config.scene_cache.max_memory_bytes = 1_000;
        let provider = StagedSceneProvider::new(1).with_default_bytes(10_000);
        let f = fixture(config, provider, &["huge"]);
        f.runtime.boot().await.unwrap();

        f.runtime.change_scene("huge").unwrap();
        f.settle().await;
        for _ in 0..5 {
            assert!(f.frame().await.evicted.is_empty());
        }

        let scenes = f.runtime.scenes();
        assert_eq!(scenes.active_scene(), Some(&id("huge")));
        assert_eq!(scenes.memory_estimate(), 10_000);
    }

    #[tokio::test]
    async fn test_state_carried_across_scene_changes() {
        let f = fixture(
            RuntimeConfig::default(),
            StagedSceneProvider::new(1),
            &["lab", "field"],
        );
        f.runtime.boot().await.unwrap();
        let progress = LessonProgress::new();
        f.runtime.scenes().register_participant(progress.clone());

        f.runtime.change_scene("lab").unwrap();
        f.settle().await;
        progress.set(json!({ "step": 3 }));

        f.runtime.change_scene("field").unwrap();
        f.settle().await;
        progress.set(json!({ "step": 9 }));

        assert_eq!(f.runtime.change_scene("lab").unwrap(), SwapOutcome::Activated);
        assert_eq!(progress.get(), json!({ "step": 3 }));

        f.runtime.change_scene("field").unwrap();
        assert_eq!(progress.get(), json!({ "step": 9 }));
    }

    #[tokio::test]
    async fn test_snapshot_persists_through_save_subsystem() {
        let f = fixture(
            RuntimeConfig::default(),
            StagedSceneProvider::new(1),
            &["lab", "field"],
        );
        f.runtime.boot().await.unwrap();
        let progress = LessonProgress::new();
        f.runtime.scenes().register_participant(progress.clone());

        f.runtime.change_scene("lab").unwrap();
        f.settle().await;
        progress.set(json!("checkpoint"));

        let mut scenes = f.runtime.scenes();
        scenes.preserve_state(&id("lab")).unwrap();
        scenes.persist_snapshot(&id("lab")).unwrap();
        assert_eq!(
            f.save.keys_with_prefix(SNAPSHOT_KEY_PREFIX),
            vec!["snapshot/lab".to_string()]
        );

        scenes.clear_snapshot(&id("lab"));
        progress.set(Value::Null);
        assert!(scenes.restore_persisted_snapshot(&id("lab")).unwrap());
        assert_eq!(progress.get(), json!("checkpoint"));
    }

    #[tokio::test]
    async fn test_global_state_survives_swaps() {
        let f = fixture(
            RuntimeConfig::default(),
            StagedSceneProvider::new(1),
            &["lab", "field"],
        );
        f.runtime.boot().await.unwrap();
        f.runtime
            .scenes()
            .global_state_mut()
            .set("language", json!("en"));

        for scene in ["lab", "field", "lab"] {
            f.runtime.change_scene(scene).unwrap();
            f.settle().await;
        }

        assert_eq!(
            f.runtime.scenes().global_state().get("language"),
            Some(&json!("en"))
        );
    }
}
