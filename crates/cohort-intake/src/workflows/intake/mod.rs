//! Applicant intake: the editable form schema, the step engine that walks an applicant
//! through it, and the session service the HTTP layer talks to.

pub mod answer;
pub mod engine;
pub mod router;
pub mod schema;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use answer::{Answer, AnswerError, PhoneNumber, NOT_APPLICABLE};
pub use engine::{
    ApplicationSink, FocusTarget, IntakeError, IntakeFormEngine, SubmitStart, ToggleIssue,
    ValidationError,
};
pub use router::intake_router;
pub use schema::{
    Disclosure, FieldId, FieldKind, FieldRole, FieldUpdate, FormField, FormSchema,
    FormSchemaRegistry, SchemaError, Section, PACKAGE_FIELD,
};
pub use service::{IntakeService, SESSION_IDLE_LIMIT};
pub use session::{
    Application, ApplicationSnapshot, IntakeSession, IntakeSessionView, SessionId, Step,
    SubmissionReceipt, SubmissionState, Toggle,
};
