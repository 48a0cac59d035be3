use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::answer::Answer;
use super::engine::{ApplicationSink, IntakeError, IntakeFormEngine, SubmitStart};
use super::schema::{Disclosure, FieldId, FormSchemaRegistry};
use super::session::{
    IntakeSession, IntakeSessionView, SessionId, SubmissionReceipt, SubmissionState, Toggle,
};

/// Sessions untouched for this long are dropped when the next session starts.
pub const SESSION_IDLE_LIMIT: Duration = Duration::from_secs(2 * 60 * 60);

enum Slot {
    Open {
        session: IntakeSession,
        touched: Instant,
    },
    /// Only the receipt outlives a successful submission.
    Submitted {
        receipt: SubmissionReceipt,
        touched: Instant,
    },
}

impl Slot {
    fn is_stale(&self, now: Instant, limit: Duration) -> bool {
        match self {
            Slot::Open { session, .. } if *session.submission() == SubmissionState::InFlight => {
                false
            }
            Slot::Open { touched, .. } | Slot::Submitted { touched, .. } => {
                now.saturating_duration_since(*touched) >= limit
            }
        }
    }
}

/// Holds live intake sessions and routes finished applications into the sink.
pub struct IntakeService<S> {
    engine: IntakeFormEngine,
    sink: Arc<S>,
    sessions: Mutex<HashMap<SessionId, Slot>>,
    idle_limit: Duration,
}

impl<S> IntakeService<S>
where
    S: ApplicationSink + 'static,
{
    pub fn new(registry: Arc<FormSchemaRegistry>, sink: Arc<S>) -> Self {
        Self {
            engine: IntakeFormEngine::new(registry),
            sink,
            sessions: Mutex::new(HashMap::new()),
            idle_limit: SESSION_IDLE_LIMIT,
        }
    }

    pub fn with_idle_limit(mut self, idle_limit: Duration) -> Self {
        self.idle_limit = idle_limit;
        self
    }

    pub fn registry(&self) -> &Arc<FormSchemaRegistry> {
        self.engine.registry()
    }

    pub fn start(&self) -> IntakeSessionView {
        let session = self.engine.start();
        let view = session.view();
        tracing::debug!(
            session_id = %view.session_id,
            schema_revision = view.schema_revision,
            "intake session started"
        );
        let now = Instant::now();
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        let before = sessions.len();
        sessions.retain(|_, slot| !slot.is_stale(now, self.idle_limit));
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "idle intake sessions dropped");
        }
        sessions.insert(
            session.id(),
            Slot::Open {
                session,
                touched: now,
            },
        );
        view
    }

    /// Live sessions plus retained receipts.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("session mutex poisoned").len()
    }

    pub fn view(&self, id: SessionId) -> Result<IntakeSessionView, IntakeError> {
        self.with_session(id, |_, session| Ok(session.view()))
    }

    pub fn set_answer(
        &self,
        id: SessionId,
        field_id: &FieldId,
        answer: Answer,
    ) -> Result<IntakeSessionView, IntakeError> {
        self.with_session(id, |engine, session| {
            engine.set_answer(session, field_id, answer)?;
            Ok(session.view())
        })
    }

    pub fn clear_answer(
        &self,
        id: SessionId,
        field_id: &FieldId,
    ) -> Result<IntakeSessionView, IntakeError> {
        self.with_session(id, |engine, session| {
            engine.clear_answer(session, field_id)?;
            Ok(session.view())
        })
    }

    pub fn set_toggle(
        &self,
        id: SessionId,
        disclosure: Disclosure,
        toggle: Toggle,
    ) -> Result<IntakeSessionView, IntakeError> {
        self.with_session(id, |engine, session| {
            engine.set_toggle(session, disclosure, toggle)?;
            Ok(session.view())
        })
    }

    pub fn advance(&self, id: SessionId) -> Result<IntakeSessionView, IntakeError> {
        self.with_session(id, |engine, session| {
            engine.advance(session)?;
            Ok(session.view())
        })
    }

    pub fn retreat(&self, id: SessionId) -> Result<IntakeSessionView, IntakeError> {
        self.with_session(id, |engine, session| {
            engine.retreat(session);
            Ok(session.view())
        })
    }

    /// Submits the session's application. The session lock is released while the sink
    /// writes, so a concurrent call sees the in-flight marker instead of waiting. Once
    /// stored, the session is replaced by its receipt; repeats return that receipt.
    pub fn submit(&self, id: SessionId, consent: bool) -> Result<SubmissionReceipt, IntakeError> {
        if let Some(receipt) = self.receipt(id) {
            return Ok(receipt);
        }
        let snapshot = match self.with_session(id, |engine, session| {
            engine.begin_submit(session, consent)
        })? {
            SubmitStart::Completed(receipt) => return Ok(receipt),
            SubmitStart::Ready(snapshot) => snapshot,
        };

        let outcome = self.sink.persist(snapshot);
        if let Err(error) = &outcome {
            tracing::warn!(session_id = %id, error = %error, "intake submission failed to persist");
        }

        let receipt = self.with_session(id, |engine, session| {
            engine.complete_submit(session, outcome)
        })?;
        self.sessions.lock().expect("session mutex poisoned").insert(
            id,
            Slot::Submitted {
                receipt: receipt.clone(),
                touched: Instant::now(),
            },
        );
        tracing::info!(
            session_id = %id,
            registration_id = %receipt.registration_id,
            "intake submission recorded"
        );
        Ok(receipt)
    }

    fn with_session<T>(
        &self,
        id: SessionId,
        apply: impl FnOnce(&IntakeFormEngine, &mut IntakeSession) -> Result<T, IntakeError>,
    ) -> Result<T, IntakeError> {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        match sessions.get_mut(&id) {
            Some(Slot::Open { session, touched }) => {
                *touched = Instant::now();
                apply(&self.engine, session)
            }
            Some(Slot::Submitted { .. }) => Err(IntakeError::SessionClosed),
            None => Err(IntakeError::SessionNotFound(id)),
        }
    }

    fn receipt(&self, id: SessionId) -> Option<SubmissionReceipt> {
        match self.sessions.lock().expect("session mutex poisoned").get(&id) {
            Some(Slot::Submitted { receipt, .. }) => Some(receipt.clone()),
            _ => None,
        }
    }
}
