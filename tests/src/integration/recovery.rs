//! # Recovery Scenarios
//!
//! Runtime health failures detected by the sweep and retried a bounded
//! number of times.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::Fixture;
    use scene_cache::StagedSceneProvider;
    use shared_bus::{EventFilter, RuntimeEvent};
    use shared_types::{GameState, HealthReport, HealthStatus, LifecycleState, SubsystemId};

    async fn booted() -> Fixture {
        let f = Fixture::standard(StagedSceneProvider::new(1), &[]);
        f.runtime.boot().await.unwrap();
        f
    }

    #[tokio::test]
    async fn test_permanent_failure_stops_at_bound() {
        let f = booted().await;
        let audio = f.scripted(SubsystemId::Audio).clone();
        let mut audio_events = f
            .runtime
            .subscribe(EventFilter::from_subsystems(vec![SubsystemId::Audio]));
        let max = f.runtime.coordinator().max_recovery_attempts();
        assert_eq!(max, 3);

        audio.set_health(HealthReport::unhealthy("device lost"));
        audio.fail_always("device lost");
        for _ in 0..10 {
            f.next_sweep().await;
        }

        assert_eq!(audio.init_calls(), max + 1);
        let descriptor = f.runtime.registry().descriptor(SubsystemId::Audio).unwrap();
        assert_eq!(descriptor.state, LifecycleState::Error);
        assert!(descriptor.recovery_exhausted);

        let exhausted: Vec<_> = audio_events
            .drain()
            .into_iter()
            .filter(|e| matches!(e, RuntimeEvent::RecoveryExhausted { .. }))
            .collect();
        assert_eq!(
            exhausted,
            vec![RuntimeEvent::RecoveryExhausted {
                subsystem: SubsystemId::Audio,
                attempts: max,
            }]
        );
        // Runtime failures do not move the game state.
        assert_eq!(f.runtime.game_state(), GameState::MainMenu);
    }

    #[tokio::test]
    async fn test_transient_failure_recovers_and_resets_counter() {
        let f = booted().await;
        let audio = f.scripted(SubsystemId::Audio).clone();
        let mut audio_events = f
            .runtime
            .subscribe(EventFilter::from_subsystems(vec![SubsystemId::Audio]));

        audio.set_health(HealthReport::unhealthy("buffer underrun"));
        audio.fail_next(1, "device busy");
        let first = f.next_sweep().await.sweep.unwrap();
        assert_eq!(first.unhealthy, vec![SubsystemId::Audio]);
        assert!(first.recovered.is_empty());

        audio.set_health(HealthReport::healthy());
        let second = f.next_sweep().await.sweep.unwrap();
        assert_eq!(second.recovered, vec![SubsystemId::Audio]);

        let descriptor = f.runtime.registry().descriptor(SubsystemId::Audio).unwrap();
        assert_eq!(descriptor.state, LifecycleState::Ready);
        assert_eq!(descriptor.recovery_attempts, 2);
        assert!(audio_events.drain().contains(&RuntimeEvent::SubsystemRecovered {
            subsystem: SubsystemId::Audio,
            attempts: 2,
        }));

        // The counter clears on the first healthy report after recovery.
        let third = f.next_sweep().await.sweep.unwrap();
        assert!(third.unhealthy.is_empty());
        let descriptor = f.runtime.registry().descriptor(SubsystemId::Audio).unwrap();
        assert_eq!(descriptor.recovery_attempts, 0);
    }

    #[tokio::test]
    async fn test_reinit_ok_but_never_healthy_stops_at_bound() {
        let f = booted().await;
        let audio = f.scripted(SubsystemId::Audio).clone();
        let max = f.runtime.coordinator().max_recovery_attempts();

        audio.set_health(HealthReport::unhealthy("device lost"));
        let mut exhausted = Vec::new();
        for _ in 0..20 {
            exhausted.extend(f.next_sweep().await.sweep.unwrap().exhausted);
        }

        assert_eq!(audio.init_calls(), max + 1);
        assert_eq!(exhausted, vec![SubsystemId::Audio]);
        let descriptor = f.runtime.registry().descriptor(SubsystemId::Audio).unwrap();
        assert_eq!(descriptor.state, LifecycleState::Error);
        assert!(descriptor.recovery_exhausted);
    }

    #[tokio::test]
    async fn test_degraded_counts_as_unhealthy() {
        let f = booted().await;
        let assets = f.scripted(SubsystemId::Assets).clone();
        let mut assets_events = f
            .runtime
            .subscribe(EventFilter::from_subsystems(vec![SubsystemId::Assets]));

        assets.set_health(HealthReport::degraded("streaming slow"));
        let sweep = f.next_sweep().await.sweep.unwrap();

        assert_eq!(sweep.unhealthy, vec![SubsystemId::Assets]);
        assert_eq!(sweep.recovered, vec![SubsystemId::Assets]);
        assert_eq!(assets.init_calls(), 2);
        assert!(assets_events.drain().contains(&RuntimeEvent::HealthDegraded {
            subsystem: SubsystemId::Assets,
            status: HealthStatus::Degraded,
            message: "streaming slow".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_operator_reset_allows_recovery_again() {
        let f = booted().await;
        let audio = f.scripted(SubsystemId::Audio).clone();
        audio.set_health(HealthReport::unhealthy("device lost"));
        audio.fail_always("device lost");
        for _ in 0..5 {
            f.next_sweep().await;
        }
        assert!(f
            .runtime
            .registry()
            .descriptor(SubsystemId::Audio)
            .unwrap()
            .recovery_exhausted);

        audio.heal();
        f.runtime.coordinator().reset_recovery(SubsystemId::Audio);
        let sweep = f.next_sweep().await.sweep.unwrap();

        assert_eq!(sweep.recovered, vec![SubsystemId::Audio]);
        assert_eq!(
            f.runtime.registry().state(SubsystemId::Audio),
            Some(LifecycleState::Ready)
        );
    }

    #[tokio::test]
    async fn test_sweep_cadence() {
        let f = booted().await;

        assert!(f.frame().await.sweep.is_some());
        assert!(f.frame().await.sweep.is_none());
        assert!(f.next_sweep().await.sweep.is_some());

        f.runtime
            .coordinator()
            .transition_to_state(GameState::Error, false)
            .unwrap();
        assert!(f.frame().await.sweep.is_some());
    }
}
