use std::sync::Arc;

use serde::Serialize;

use super::answer::{Answer, AnswerError};
use super::schema::{Disclosure, FieldId, FieldRole, FormSchemaRegistry};
use super::session::{
    ApplicationSnapshot, IntakeSession, SessionId, Step, SubmissionReceipt, SubmissionState,
    Toggle,
};

/// Where the form should move the applicant's attention after a failed advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", content = "field", rename_all = "snake_case")]
pub enum FocusTarget {
    Field(FieldId),
    Top,
}

/// Disclosure toggle left unanswered, with the message shown next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleIssue {
    pub disclosure: Disclosure,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error(
    "{} step is incomplete: {} field(s) and {} toggle(s) need attention",
    .step.label(),
    .fields.len(),
    .toggles.len()
)]
pub struct ValidationError {
    pub step: Step,
    /// Erroring fields in declared order.
    pub fields: Vec<FieldId>,
    pub toggles: Vec<ToggleIssue>,
    pub focus: FocusTarget,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error("intake session {0} not found")]
    SessionNotFound(SessionId),
    #[error("the {} step cannot be advanced", .0.label())]
    CannotAdvance(Step),
    #[error("submission is only possible from the payment step, session is at {}", .0.label())]
    NotAtPayment(Step),
    #[error("the applicant must accept the terms before submitting")]
    ConsentRequired,
    #[error("a submission for this session is already in flight")]
    SubmissionInFlight,
    #[error("the session no longer accepts edits")]
    SessionClosed,
    #[error("registration could not be stored: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Destination of submitted applications.
pub trait ApplicationSink: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn persist(&self, snapshot: ApplicationSnapshot) -> Result<SubmissionReceipt, Self::Error>;
}

/// First half of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStart {
    /// Snapshot ready to hand to the sink; the session is now in flight.
    Ready(ApplicationSnapshot),
    /// The session was submitted before; nothing else to write.
    Completed(SubmissionReceipt),
}

/// Drives sessions through the intake steps against their schema snapshot.
#[derive(Debug, Clone)]
pub struct IntakeFormEngine {
    registry: Arc<FormSchemaRegistry>,
}

impl IntakeFormEngine {
    pub fn new(registry: Arc<FormSchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<FormSchemaRegistry> {
        &self.registry
    }

    /// Opens a session bound to the current schema revision.
    pub fn start(&self) -> IntakeSession {
        IntakeSession::new(self.registry.snapshot())
    }

    pub fn set_answer(
        &self,
        session: &mut IntakeSession,
        field_id: &FieldId,
        answer: Answer,
    ) -> Result<(), IntakeError> {
        ensure_open(session)?;
        let field = session
            .schema
            .field(field_id)
            .ok_or_else(|| AnswerError::UnknownField(field_id.clone()))?;
        if let FieldRole::Disclosure(disclosure) = field.role {
            if session.application.toggle(disclosure) == Toggle::No {
                return Err(AnswerError::Suppressed(field_id.clone()).into());
            }
        }

        let answer = answer.validated_for(field)?;
        session.application.put(field_id.clone(), answer);
        session.errors.remove(field_id);
        Ok(())
    }

    pub fn clear_answer(
        &self,
        session: &mut IntakeSession,
        field_id: &FieldId,
    ) -> Result<(), IntakeError> {
        ensure_open(session)?;
        let field = session
            .schema
            .field(field_id)
            .ok_or_else(|| AnswerError::UnknownField(field_id.clone()))?;
        if let FieldRole::Disclosure(disclosure) = field.role {
            if session.application.toggle(disclosure) == Toggle::No {
                return Err(AnswerError::Suppressed(field_id.clone()).into());
            }
        }

        session.application.remove(field_id);
        session.errors.remove(field_id);
        Ok(())
    }

    /// Records a disclosure answer. "No" fills the paired detail as not applicable; leaving
    /// "No" drops that auto-filled marker again.
    pub fn set_toggle(
        &self,
        session: &mut IntakeSession,
        disclosure: Disclosure,
        toggle: Toggle,
    ) -> Result<(), IntakeError> {
        ensure_open(session)?;
        session.application.set_toggle(disclosure, toggle);

        let Some(detail) = session.schema.disclosure_field(disclosure).map(|f| f.id.clone()) else {
            return Ok(());
        };
        match toggle {
            Toggle::No => {
                session.application.put(detail.clone(), Answer::NotApplicable);
                session.errors.remove(&detail);
            }
            Toggle::Yes | Toggle::Unset => {
                if session.application.answer(&detail) == Some(&Answer::NotApplicable) {
                    session.application.remove(&detail);
                }
            }
        }
        Ok(())
    }

    /// Validates the current section and moves to the next step.
    pub fn advance(&self, session: &mut IntakeSession) -> Result<Step, IntakeError> {
        if session.submission == SubmissionState::InFlight {
            return Err(IntakeError::SubmissionInFlight);
        }
        let Some(next) = session.step.next() else {
            return Err(IntakeError::CannotAdvance(session.step));
        };

        validate_step(session)?;
        tracing::debug!(
            session_id = %session.id,
            from = session.step.label(),
            to = next.label(),
            "intake step advanced"
        );
        session.step = next;
        Ok(next)
    }

    /// Moves back one step. A no-op on the intro and success steps.
    pub fn retreat(&self, session: &mut IntakeSession) -> Step {
        if session.submission != SubmissionState::InFlight {
            if let Some(previous) = session.step.previous() {
                session.step = previous;
            }
        }
        session.step
    }

    pub fn begin_submit(
        &self,
        session: &mut IntakeSession,
        consent: bool,
    ) -> Result<SubmitStart, IntakeError> {
        match &session.submission {
            SubmissionState::InFlight => return Err(IntakeError::SubmissionInFlight),
            SubmissionState::Submitted { receipt } => {
                return Ok(SubmitStart::Completed(receipt.clone()))
            }
            SubmissionState::Idle => {}
        }
        if session.step != Step::Payment {
            return Err(IntakeError::NotAtPayment(session.step));
        }
        if !consent {
            return Err(IntakeError::ConsentRequired);
        }

        validate_step(session)?;
        session.submission = SubmissionState::InFlight;
        Ok(SubmitStart::Ready(session.snapshot()))
    }

    /// Settles an in-flight submission with the outcome of the registration write.
    pub fn complete_submit<E>(
        &self,
        session: &mut IntakeSession,
        outcome: Result<SubmissionReceipt, E>,
    ) -> Result<SubmissionReceipt, IntakeError>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match outcome {
            Ok(receipt) => {
                session.submission = SubmissionState::Submitted {
                    receipt: receipt.clone(),
                };
                session.step = Step::Success;
                Ok(receipt)
            }
            Err(error) => {
                session.submission = SubmissionState::Idle;
                Err(IntakeError::Persistence(Box::new(error)))
            }
        }
    }

    /// Validates, persists through the sink, and only then marks the session successful.
    pub fn submit<S>(
        &self,
        session: &mut IntakeSession,
        consent: bool,
        sink: &S,
    ) -> Result<SubmissionReceipt, IntakeError>
    where
        S: ApplicationSink + ?Sized,
    {
        match self.begin_submit(session, consent)? {
            SubmitStart::Completed(receipt) => Ok(receipt),
            SubmitStart::Ready(snapshot) => {
                let outcome = sink.persist(snapshot);
                self.complete_submit(session, outcome)
            }
        }
    }
}

fn ensure_open(session: &IntakeSession) -> Result<(), IntakeError> {
    if session.step == Step::Success || session.submission != SubmissionState::Idle {
        return Err(IntakeError::SessionClosed);
    }
    Ok(())
}

fn validate_step(session: &mut IntakeSession) -> Result<(), ValidationError> {
    let step = session.step;
    let Some(section) = step.section() else {
        return Ok(());
    };

    let schema = Arc::clone(&session.schema);
    let application = &mut session.application;
    let mut fields = Vec::new();

    for field in schema.section_fields(section) {
        match field.role {
            FieldRole::Referral => {
                if application.is_unanswered(&field.id) {
                    application.put(field.id.clone(), Answer::NotApplicable);
                }
            }
            FieldRole::Disclosure(disclosure) => match application.toggle(disclosure) {
                Toggle::No => application.put(field.id.clone(), Answer::NotApplicable),
                Toggle::Yes if application.is_unanswered(&field.id) => {
                    fields.push(field.id.clone())
                }
                Toggle::Yes | Toggle::Unset => {}
            },
            FieldRole::Standard => {
                if field.required && application.is_unanswered(&field.id) {
                    fields.push(field.id.clone());
                }
            }
        }
    }

    let toggles: Vec<ToggleIssue> = Disclosure::ordered()
        .into_iter()
        .filter(|disclosure| disclosure.section() == section)
        .filter(|disclosure| application.toggle(*disclosure) == Toggle::Unset)
        .map(|disclosure| ToggleIssue {
            disclosure,
            message: disclosure.unset_message(),
        })
        .collect();

    session.errors = fields.iter().cloned().collect();
    if fields.is_empty() && toggles.is_empty() {
        return Ok(());
    }

    let focus = fields
        .first()
        .cloned()
        .map_or(FocusTarget::Top, FocusTarget::Field);
    Err(ValidationError {
        step,
        fields,
        toggles,
        focus,
    })
}
