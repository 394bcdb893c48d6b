//! # Boot Scenarios
//!
//! Fail-fast startup in configured order, and re-initialization after the
//! failing subsystem is fixed.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::Fixture;
    use app_runtime::adapters::ScriptedSubsystem;
    use app_runtime::{RuntimeConfig, RuntimeError};
    use scene_cache::StagedSceneProvider;
    use shared_bus::{EventFilter, EventTopic, RuntimeEvent};
    use shared_types::{GameState, LifecycleState, SubsystemErrorKind, SubsystemId};

    fn failing_assets() -> Fixture {
        Fixture::new(
            RuntimeConfig::default(),
            StagedSceneProvider::new(1),
            vec![
                ScriptedSubsystem::new(SubsystemId::Config),
                ScriptedSubsystem::new(SubsystemId::Assets).always_failing("missing content pack"),
                ScriptedSubsystem::new(SubsystemId::Audio),
            ],
            &[],
        )
    }

    #[tokio::test]
    async fn test_healthy_boot_reaches_main_menu() {
        let f = Fixture::standard(StagedSceneProvider::new(1), &[]);

        f.runtime.boot().await.unwrap();

        assert_eq!(f.runtime.game_state(), GameState::MainMenu);
        for id in [
            SubsystemId::Config,
            SubsystemId::Assets,
            SubsystemId::Audio,
            SubsystemId::Save,
        ] {
            assert_eq!(f.runtime.registry().state(id), Some(LifecycleState::Ready));
        }
        assert!(f.save.is_open());
    }

    #[tokio::test]
    async fn test_startup_failure_stops_remaining_subsystems() {
        let f = failing_assets();
        let mut subsystem_events =
            f.runtime.subscribe(EventFilter::topics(vec![EventTopic::Subsystem]));

        let err = f.runtime.boot().await.unwrap_err();

        match err {
            RuntimeError::Startup(e) => assert_eq!(e.subsystem, SubsystemId::Assets),
            other => panic!("unexpected error: {other}"),
        }
        let registry = f.runtime.registry();
        assert_eq!(registry.state(SubsystemId::Config), Some(LifecycleState::Ready));
        assert_eq!(registry.state(SubsystemId::Assets), Some(LifecycleState::Error));
        assert_eq!(
            registry.state(SubsystemId::Audio),
            Some(LifecycleState::NotInitialized)
        );
        assert_eq!(f.scripted(SubsystemId::Audio).init_calls(), 0);
        assert_eq!(f.runtime.game_state(), GameState::Error);

        let events = subsystem_events.drain();
        assert_eq!(
            events,
            vec![
                RuntimeEvent::SubsystemReady {
                    subsystem: SubsystemId::Config
                },
                RuntimeEvent::SubsystemFailed {
                    subsystem: SubsystemId::Assets,
                    message: "missing content pack".to_string(),
                    during_startup: true,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_startup_failure_is_not_auto_recovered() {
        let f = failing_assets();
        let _ = f.runtime.boot().await;

        for _ in 0..5 {
            f.next_sweep().await;
        }

        assert_eq!(f.scripted(SubsystemId::Assets).init_calls(), 1);
        assert_eq!(
            f.runtime.registry().state(SubsystemId::Assets),
            Some(LifecycleState::Error)
        );
    }

    #[tokio::test]
    async fn test_reinit_after_fix_skips_ready_subsystems() {
        let f = failing_assets();
        let _ = f.runtime.boot().await;

        f.scripted(SubsystemId::Assets).heal();
        f.runtime.boot().await.unwrap();

        assert_eq!(f.runtime.game_state(), GameState::MainMenu);
        assert_eq!(f.scripted(SubsystemId::Config).init_calls(), 1);
        assert_eq!(f.scripted(SubsystemId::Assets).init_calls(), 2);
        assert_eq!(f.scripted(SubsystemId::Audio).init_calls(), 1);
    }

    #[tokio::test]
    async fn test_subsystems_unavailable_until_ready() {
        let f = failing_assets();
        let _ = f.runtime.boot().await;
        let coordinator = f.runtime.coordinator();

        let err = coordinator
            .get_subsystem_as::<ScriptedSubsystem>(SubsystemId::Audio)
            .err()
            .unwrap();
        assert_eq!(err.kind, SubsystemErrorKind::NotReady);

        let config = coordinator
            .get_subsystem_as::<ScriptedSubsystem>(SubsystemId::Config)
            .unwrap();
        assert!(config.is_running());

        let err = coordinator.get_subsystem(SubsystemId::Content).err().unwrap();
        assert_eq!(err.kind, SubsystemErrorKind::NotRegistered);
    }

    #[tokio::test]
    async fn test_shutdown_runs_in_reverse_order() {
        let f = Fixture::standard(StagedSceneProvider::new(1), &[]);
        f.runtime.boot().await.unwrap();

        f.runtime.shutdown().await;

        for id in [SubsystemId::Config, SubsystemId::Assets, SubsystemId::Audio] {
            assert_eq!(f.scripted(id).shutdown_calls(), 1);
            assert!(!f.scripted(id).is_running());
            assert_eq!(
                f.runtime.registry().state(id),
                Some(LifecycleState::NotInitialized)
            );
        }
        assert!(!f.save.is_open());
    }
}
