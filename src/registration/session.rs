//! In-memory registration sessions.
//!
//! Sessions are keyed by a random UUID handed to the client. Nothing is
//! persisted: a restart or an idle timeout drops the conversation.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::observability::metrics;
use crate::registration::flow::{FlowError, FlowEvent, FlowReply, RegistrationFlow};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("registration session not found")]
    NotFound,

    #[error("too many registrations in progress, please try again shortly")]
    Full,

    #[error(transparent)]
    Flow(#[from] FlowError),
}

#[derive(Debug)]
struct Session {
    flow: RegistrationFlow,
    last_active: Instant,
}

/// Concurrent map of live registration conversations.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
        }
    }

    /// Start a new conversation; returns its id and opening prompt.
    ///
    /// The cap is checked before inserting, so concurrent creates may
    /// overshoot it by a few entries.
    pub fn create(&self) -> Result<(Uuid, FlowReply), SessionError> {
        if self.sessions.len() >= self.max_sessions {
            tracing::warn!(max_sessions = self.max_sessions, "Registration session limit reached");
            return Err(SessionError::Full);
        }
        let id = Uuid::new_v4();
        let flow = RegistrationFlow::new();
        let greeting = flow.greeting();
        self.sessions.insert(
            id,
            Session {
                flow,
                last_active: Instant::now(),
            },
        );
        metrics::set_registration_sessions(self.sessions.len());
        tracing::info!(session_id = %id, "Registration session started");
        Ok((id, greeting))
    }

    /// Feed an event to a session.
    pub fn apply(
        &self,
        id: Uuid,
        event: FlowEvent,
        today: NaiveDate,
    ) -> Result<FlowReply, SessionError> {
        let mut session = self.sessions.get_mut(&id).ok_or(SessionError::NotFound)?;
        session.last_active = Instant::now();

        let from = session.flow.state();
        let reply = session.flow.handle(event, today)?;

        metrics::record_registration_event(reply.state.name());
        tracing::debug!(
            session_id = %id,
            from = from.name(),
            to = reply.state.name(),
            "Registration transition"
        );
        if reply.submitted {
            tracing::info!(
                session_id = %id,
                fields = ?reply.record.present_fields(),
                "Registration confirmed"
            );
        }
        Ok(reply)
    }

    /// Current prompt and record without advancing.
    pub fn snapshot(&self, id: Uuid) -> Result<FlowReply, SessionError> {
        self.sessions
            .get(&id)
            .map(|s| s.flow.current_prompt())
            .ok_or(SessionError::NotFound)
    }

    /// Drop a session. Returns false if it did not exist.
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            metrics::set_registration_sessions(self.sessions.len());
            tracing::info!(session_id = %id, "Registration session closed");
        }
        removed
    }

    /// Discard sessions idle for longer than `ttl`. Returns how many went.
    pub fn purge_idle(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.last_active.elapsed() <= ttl);
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            metrics::set_registration_sessions(self.sessions.len());
            tracing::info!(purged, "Expired idle registration sessions");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::flow::FlowState;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn create_apply_snapshot_remove() {
        let store = SessionStore::new(10);
        let (id, greeting) = store.create().unwrap();
        assert_eq!(greeting.state, FlowState::AwaitingDocument);
        assert_eq!(store.len(), 1);

        let reply = store
            .apply(id, FlowEvent::Message("skip".into()), today())
            .unwrap();
        assert!(matches!(reply.state, FlowState::Collecting(_)));

        let snapshot = store.snapshot(id).unwrap();
        assert_eq!(snapshot.state, reply.state);

        assert!(store.remove(id));
        assert!(!store.remove(id));
        assert_eq!(store.snapshot(id), Err(SessionError::NotFound));
    }

    #[test]
    fn unknown_session_is_not_found() {
        let store = SessionStore::new(10);
        let err = store
            .apply(Uuid::new_v4(), FlowEvent::Message("hi".into()), today())
            .unwrap_err();
        assert_eq!(err, SessionError::NotFound);
    }

    #[test]
    fn flow_errors_pass_through() {
        let store = SessionStore::new(10);
        let (id, _) = store.create().unwrap();
        let err = store
            .apply(id, FlowEvent::Message(" ".into()), today())
            .unwrap_err();
        assert_eq!(err, SessionError::Flow(FlowError::EmptyMessage));
    }

    #[test]
    fn purge_only_removes_idle_sessions() {
        let store = SessionStore::new(10);
        store.create().unwrap();
        store.create().unwrap();

        assert_eq!(store.purge_idle(Duration::from_secs(60)), 0);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.purge_idle(Duration::from_millis(5)), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn creation_refused_at_capacity() {
        let store = SessionStore::new(2);
        let (first, _) = store.create().unwrap();
        store.create().unwrap();
        assert_eq!(store.create().unwrap_err(), SessionError::Full);
        assert_eq!(store.len(), 2);

        store.remove(first);
        assert!(store.create().is_ok());
    }
}
