//! # Game-State Transitions
//!
//! The static adjacency table, forced transitions, bounded history, and the
//! pause hook on the simulation clock.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::Fixture;
    use scene_cache::StagedSceneProvider;
    use shared_bus::{EventFilter, EventTopic, RuntimeEvent};
    use shared_types::{GameState, TransitionError};

    async fn booted() -> Fixture {
        let f = Fixture::standard(StagedSceneProvider::new(1), &[]);
        f.runtime.boot().await.unwrap();
        f
    }

    #[tokio::test]
    async fn test_every_pair_follows_table() {
        let f = booted().await;
        let coordinator = f.runtime.coordinator();

        for from in GameState::all() {
            for to in GameState::all() {
                coordinator.transition_to_state(from, true).unwrap();
                let result = coordinator.transition_to_state(to, false);

                if from != to && from.can_transition_to(to) {
                    assert!(result.is_ok(), "{from} -> {to} should be allowed");
                    assert_eq!(coordinator.game_state(), to);
                } else {
                    assert_eq!(
                        result,
                        Err(TransitionError::InvalidTransition { from, to }),
                        "{from} -> {to} should be rejected"
                    );
                    assert_eq!(coordinator.game_state(), from);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_rejection_publishes_nothing() {
        let f = booted().await;
        let mut lifecycle = f
            .runtime
            .subscribe(EventFilter::topics(vec![EventTopic::Lifecycle]));
        let coordinator = f.runtime.coordinator();

        assert!(coordinator
            .transition_to_state(GameState::Paused, false)
            .is_err());
        assert!(coordinator
            .transition_to_state(GameState::MainMenu, false)
            .is_err());

        assert!(lifecycle.drain().is_empty());
        assert_eq!(coordinator.previous_state(), Some(GameState::Initializing));
    }

    #[tokio::test]
    async fn test_forced_transition_is_flagged() {
        let f = booted().await;
        let mut lifecycle = f
            .runtime
            .subscribe(EventFilter::topics(vec![EventTopic::Lifecycle]));

        f.runtime
            .coordinator()
            .transition_to_state(GameState::Cutscene, true)
            .unwrap();

        assert_eq!(
            lifecycle.drain(),
            vec![RuntimeEvent::GameStateChanged {
                from: GameState::MainMenu,
                to: GameState::Cutscene,
                forced: true,
            }]
        );
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let f = booted().await;
        let coordinator = f.runtime.coordinator();
        let capacity = f.runtime.config().history_capacity;

        for _ in 0..20 {
            coordinator
                .transition_to_state(GameState::Settings, false)
                .unwrap();
            coordinator
                .transition_to_state(GameState::MainMenu, false)
                .unwrap();
        }

        let history = coordinator.state_history();
        assert_eq!(history.len(), capacity);
        assert_eq!(history.last(), Some(&GameState::Settings));
        assert_eq!(coordinator.previous_state(), Some(GameState::Settings));
    }

    #[tokio::test]
    async fn test_pause_suspends_simulation_clock() {
        let f = booted().await;
        let coordinator = f.runtime.coordinator();
        coordinator
            .transition_to_state(GameState::Loading, false)
            .unwrap();
        coordinator
            .transition_to_state(GameState::Playing, false)
            .unwrap();

        let before = coordinator.simulation_time();
        coordinator
            .transition_to_state(GameState::Paused, false)
            .unwrap();
        assert!(coordinator.is_simulation_paused());
        f.clock.advance(10_000);
        assert_eq!(coordinator.simulation_time(), before);

        coordinator
            .transition_to_state(GameState::Playing, false)
            .unwrap();
        assert!(!coordinator.is_simulation_paused());
        f.clock.advance(500);
        assert_eq!(coordinator.simulation_time(), before + 500);
    }
}
