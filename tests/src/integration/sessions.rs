//! # Session Scenarios
//!
//! Sessions gated by game state and persisted through the Save subsystem.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::integration::fixtures::Fixture;
    use app_runtime::session::SESSION_KEY_PREFIX;
    use app_runtime::{RuntimeError, SessionError, SessionManager, SessionRecord};
    use scene_cache::StagedSceneProvider;
    use serde_json::json;
    use shared_bus::{EventFilter, EventTopic, NullPublisher, RuntimeEvent};
    use shared_types::{GameState, ManualClock, PersistenceStore, Subsystem};

    async fn booted() -> Fixture {
        let f = Fixture::standard(StagedSceneProvider::new(1), &["lab"]);
        f.runtime.boot().await.unwrap();
        f
    }

    #[tokio::test]
    async fn test_session_record_saved_on_end() {
        let f = booted().await;
        let mut session_events = f
            .runtime
            .subscribe(EventFilter::topics(vec![EventTopic::Session]));

        let id = f
            .runtime
            .start_session("lesson", BTreeMap::from([("unit".to_string(), json!(4))]))
            .unwrap();
        f.clock.advance(300);
        f.runtime
            .record_session_event("quiz_answered", json!({ "correct": true }))
            .unwrap();
        f.clock.advance(700);

        assert_eq!(f.runtime.end_session(true), 1_000);

        let key = format!("{SESSION_KEY_PREFIX}{id}");
        assert_eq!(f.save.keys_with_prefix(SESSION_KEY_PREFIX), vec![key.clone()]);
        let blob = f.save.load(&key).unwrap().unwrap();
        let record: SessionRecord = serde_json::from_slice(&blob).unwrap();
        assert_eq!(record.duration_ms, 1_000);
        assert_eq!(record.session.session_type, "lesson");
        assert_eq!(record.session.events[0].name, "quiz_answered");

        assert_eq!(
            session_events.drain(),
            vec![
                RuntimeEvent::SessionStarted {
                    session_id: id.clone(),
                    session_type: "lesson".to_string(),
                },
                RuntimeEvent::SessionEnded {
                    session_id: id,
                    duration_ms: 1_000,
                    persisted: true,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_session_refused_while_loading() {
        let f = booted().await;
        f.runtime.change_scene("lab").unwrap();
        assert_eq!(f.runtime.game_state(), GameState::Loading);

        let err = f
            .runtime
            .start_session("lesson", BTreeMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Session(SessionError::InvalidState {
                state: GameState::Loading
            })
        ));

        f.settle().await;
        assert_eq!(f.runtime.game_state(), GameState::Playing);
        assert!(f.runtime.start_session("lesson", BTreeMap::new()).is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_persists_live_session_before_save_closes() {
        let f = booted().await;
        let id = f
            .runtime
            .start_session("free-play", BTreeMap::new())
            .unwrap();

        f.runtime.shutdown().await;

        assert!(!f.save.is_open());
        assert_eq!(
            f.save.keys_with_prefix(SESSION_KEY_PREFIX),
            vec![format!("{SESSION_KEY_PREFIX}{id}")]
        );
    }

    #[tokio::test]
    async fn test_persistence_failure_still_ends_session() {
        let f = booted().await;
        f.save.shutdown().await;

        let clock = Arc::new(ManualClock::new(0));
        let mut sessions = SessionManager::new(clock.clone(), Arc::new(NullPublisher))
            .with_persistence(f.save.clone());
        sessions
            .start_session(GameState::MainMenu, "lesson", BTreeMap::new())
            .unwrap();
        clock.advance(42);

        assert_eq!(sessions.end_session(true), 42);
        assert!(!sessions.is_active());
        assert!(f.save.is_empty());
    }

    #[tokio::test]
    async fn test_end_without_session_is_noop() {
        let f = booted().await;
        assert_eq!(f.runtime.end_session(true), 0);
        assert!(f.save.is_empty());
    }
}
