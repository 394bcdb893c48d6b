//! # Session Manager
//!
//! Tracks the single live usage session.
//!
//! - Sessions start only from `MainMenu` or `Playing`
//! - Starting while another session is live ends (and persists) that one first
//! - Ending with no live session returns zero and does nothing
//!
//! Finished sessions are handed to the persistence collaborator as JSON under
//! `session/<id>`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_bus::{EventPublisher, RuntimeEvent};
use shared_types::{GameState, PersistenceError, PersistenceStore, TimeSource, Timestamp};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Key prefix for persisted session records.
pub const SESSION_KEY_PREFIX: &str = "session/";

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Sessions cannot start in this game state.
    #[error("Cannot start a session in state {state}")]
    InvalidState { state: GameState },

    /// There is no live session.
    #[error("No active session")]
    NoActiveSession,
}

/// One event recorded during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub name: String,
    pub data: Value,
    pub timestamp: Timestamp,
}

/// A usage session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub session_type: String,
    pub config: BTreeMap<String, Value>,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub events: Vec<SessionEvent>,
}

impl Session {
    /// Elapsed milliseconds, up to `ended_at` or `now`.
    pub fn duration(&self, now: Timestamp) -> u64 {
        self.ended_at.unwrap_or(now).saturating_sub(self.started_at)
    }
}

/// Record handed to persistence when a session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(flatten)]
    pub session: Session,
    pub duration_ms: u64,
}

/// The Session Manager.
pub struct SessionManager {
    active: Option<Session>,
    completed: u64,
    clock: Arc<dyn TimeSource>,
    publisher: Arc<dyn EventPublisher>,
    persistence: Option<Arc<dyn PersistenceStore>>,
}

impl SessionManager {
    pub fn new(clock: Arc<dyn TimeSource>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            active: None,
            completed: 0,
            clock,
            publisher,
            persistence: None,
        }
    }

    /// Attach the persistence collaborator.
    pub fn with_persistence(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.persistence = Some(store);
        self
    }

    /// Start a session. Any live session is ended and persisted first.
    pub fn start_session(
        &mut self,
        state: GameState,
        session_type: impl Into<String>,
        config: BTreeMap<String, Value>,
    ) -> Result<String, SessionError> {
        if !state.allows_session_start() {
            warn!("[Session] Refused to start a session in {}", state);
            return Err(SessionError::InvalidState { state });
        }
        if self.active.is_some() {
            info!("[Session] Ending live session before starting a new one");
            self.end_session(true);
        }

        let now = self.clock.now();
        let id = format!("{now}-{}", Uuid::new_v4().simple());
        let session = Session {
            id: id.clone(),
            session_type: session_type.into(),
            config,
            started_at: now,
            ended_at: None,
            events: Vec::new(),
        };
        info!(
            "[Session] Started {} ({})",
            session.id, session.session_type
        );
        self.publisher.publish(RuntimeEvent::SessionStarted {
            session_id: id.clone(),
            session_type: session.session_type.clone(),
        });
        self.active = Some(session);
        Ok(id)
    }

    /// Append an event to the live session.
    pub fn record_event(&mut self, name: impl Into<String>, data: Value) -> Result<(), SessionError> {
        let now = self.clock.now();
        let session = self.active.as_mut().ok_or(SessionError::NoActiveSession)?;
        let name = name.into();
        debug!("[Session] {} recorded {}", session.id, name);
        session.events.push(SessionEvent {
            name,
            data,
            timestamp: now,
        });
        Ok(())
    }

    /// End the live session and return its duration in milliseconds.
    ///
    /// When `persist` is set and a store is attached the record is saved;
    /// a failed save is logged and the session still ends.
    pub fn end_session(&mut self, persist: bool) -> u64 {
        let Some(mut session) = self.active.take() else {
            return 0;
        };
        let now = self.clock.now();
        session.ended_at = Some(now);
        let duration_ms = session.duration(now);
        let session_id = session.id.clone();

        let persisted = persist && self.persist(session, duration_ms);
        self.completed += 1;

        info!(
            "[Session] Ended {} after {} ms (persisted: {})",
            session_id, duration_ms, persisted
        );
        self.publisher.publish(RuntimeEvent::SessionEnded {
            session_id,
            duration_ms,
            persisted,
        });
        duration_ms
    }

    fn persist(&self, session: Session, duration_ms: u64) -> bool {
        let Some(store) = &self.persistence else {
            return false;
        };
        let key = format!("{SESSION_KEY_PREFIX}{}", session.id);
        let record = SessionRecord {
            session,
            duration_ms,
        };
        let result = serde_json::to_vec(&record)
            .map_err(PersistenceError::from)
            .and_then(|blob| store.save(&key, blob));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("[Session] Could not persist {}: {}", key, e);
                false
            }
        }
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Sessions ended since creation.
    pub fn completed_count(&self) -> u64 {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_bus::NullPublisher;
    use shared_types::{InMemoryStore, ManualClock};

    fn manager() -> (SessionManager, Arc<ManualClock>, Arc<InMemoryStore>) {
        let clock = Arc::new(ManualClock::new(10_000));
        let store = Arc::new(InMemoryStore::new());
        let manager = SessionManager::new(clock.clone(), Arc::new(NullPublisher))
            .with_persistence(store.clone());
        (manager, clock, store)
    }

    #[test]
    fn test_start_and_end() {
        let (mut sessions, clock, _) = manager();
        let id = sessions
            .start_session(GameState::MainMenu, "lesson", BTreeMap::new())
            .unwrap();
        assert!(sessions.is_active());
        assert_eq!(sessions.active_session().unwrap().id, id);

        clock.advance(1_500);
        assert_eq!(sessions.end_session(true), 1_500);
        assert!(!sessions.is_active());

        assert_eq!(sessions.end_session(true), 0);
        assert_eq!(sessions.completed_count(), 1);
    }

    #[test]
    fn test_start_gated_by_state() {
        let (mut sessions, _, _) = manager();
        for state in [GameState::Loading, GameState::Paused, GameState::Error] {
            assert_eq!(
                sessions.start_session(state, "lesson", BTreeMap::new()),
                Err(SessionError::InvalidState { state })
            );
        }
        assert!(sessions
            .start_session(GameState::Playing, "lesson", BTreeMap::new())
            .is_ok());
    }

    #[test]
    fn test_ids_are_unique() {
        let (mut sessions, _, _) = manager();
        let a = sessions
            .start_session(GameState::MainMenu, "free-play", BTreeMap::new())
            .unwrap();
        let b = sessions
            .start_session(GameState::MainMenu, "free-play", BTreeMap::new())
            .unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("10000-"));
    }

    #[test]
    fn test_restart_ends_previous_and_persists() {
        let (mut sessions, _, store) = manager();
        let first = sessions
            .start_session(GameState::MainMenu, "lesson", BTreeMap::new())
            .unwrap();
        sessions
            .start_session(GameState::MainMenu, "quiz", BTreeMap::new())
            .unwrap();

        assert_eq!(
            store.keys_with_prefix(SESSION_KEY_PREFIX),
            vec![format!("session/{first}")]
        );
        assert_eq!(sessions.active_session().unwrap().session_type, "quiz");
    }

    #[test]
    fn test_record_is_json_with_events() {
        let (mut sessions, clock, store) = manager();
        let mut config = BTreeMap::new();
        config.insert("difficulty".to_string(), json!("easy"));
        let id = sessions
            .start_session(GameState::Playing, "lesson", config)
            .unwrap();
        clock.advance(20);
        sessions
            .record_event("answer", json!({"question": 3, "correct": true}))
            .unwrap();
        clock.advance(80);
        sessions.end_session(true);

        let blob = store.load(&format!("session/{id}")).unwrap().unwrap();
        let record: SessionRecord = serde_json::from_slice(&blob).unwrap();
        assert_eq!(record.duration_ms, 100);
        assert_eq!(record.session.config["difficulty"], json!("easy"));
        assert_eq!(record.session.events.len(), 1);
        assert_eq!(record.session.events[0].timestamp, 10_020);
    }

    #[test]
    fn test_end_without_persist_writes_nothing() {
        let (mut sessions, _, store) = manager();
        sessions
            .start_session(GameState::MainMenu, "lesson", BTreeMap::new())
            .unwrap();
        sessions.end_session(false);
        assert!(store.is_empty());
    }

    #[test]
    fn test_record_event_without_session() {
        let (mut sessions, _, _) = manager();
        assert_eq!(
            sessions.record_event("answer", json!(null)),
            Err(SessionError::NoActiveSession)
        );
    }
}
