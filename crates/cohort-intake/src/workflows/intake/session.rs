use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::answer::Answer;
use super::schema::{Disclosure, FieldId, FormField, FormSchema, Section};
use crate::workflows::admissions::RegistrationId;

/// Intake steps in order. `Success` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Intro,
    Personal,
    Medical,
    Payment,
    Success,
}

impl Step {
    pub const fn section(self) -> Option<Section> {
        match self {
            Self::Intro => Some(Section::Intro),
            Self::Personal => Some(Section::Personal),
            Self::Medical => Some(Section::Medical),
            Self::Payment => Some(Section::Payment),
            Self::Success => None,
        }
    }

    /// Step reached by a validated advance. Payment leaves only through submission.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Intro => Some(Self::Personal),
            Self::Personal => Some(Self::Medical),
            Self::Medical => Some(Self::Payment),
            Self::Payment | Self::Success => None,
        }
    }

    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Personal => Some(Self::Intro),
            Self::Medical => Some(Self::Personal),
            Self::Payment => Some(Self::Medical),
            Self::Intro | Self::Success => None,
        }
    }

    pub const fn progress_percent(self) -> u8 {
        match self {
            Self::Intro => 20,
            Self::Personal => 40,
            Self::Medical => 60,
            Self::Payment => 80,
            Self::Success => 100,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Personal => "personal",
            Self::Medical => "medical",
            Self::Payment => "payment",
            Self::Success => "success",
        }
    }
}

/// Yes/no answer that starts out unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    #[default]
    Unset,
    Yes,
    No,
}

impl Toggle {
    pub const fn answer(self) -> Option<bool> {
        match self {
            Self::Unset => None,
            Self::Yes => Some(true),
            Self::No => Some(false),
        }
    }
}

/// In-progress answers of one applicant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    answers: BTreeMap<FieldId, Answer>,
    toggles: BTreeMap<Disclosure, Toggle>,
}

impl Application {
    pub fn answer(&self, field: &FieldId) -> Option<&Answer> {
        self.answers.get(field)
    }

    pub fn answers(&self) -> &BTreeMap<FieldId, Answer> {
        &self.answers
    }

    pub fn toggle(&self, disclosure: Disclosure) -> Toggle {
        self.toggles.get(&disclosure).copied().unwrap_or_default()
    }

    /// Missing, blank, or marked not applicable.
    pub fn is_unanswered(&self, field: &FieldId) -> bool {
        self.answers.get(field).map_or(true, Answer::is_unanswered)
    }

    pub(crate) fn put(&mut self, field: FieldId, answer: Answer) {
        self.answers.insert(field, answer);
    }

    pub(crate) fn remove(&mut self, field: &FieldId) -> Option<Answer> {
        self.answers.remove(field)
    }

    pub(crate) fn set_toggle(&mut self, disclosure: Disclosure, toggle: Toggle) {
        self.toggles.insert(disclosure, toggle);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Confirmation handed back once the registration write landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub registration_id: RegistrationId,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    InFlight,
    Submitted { receipt: SubmissionReceipt },
}

/// Immutable copy of a submitted application, persisted inside the registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSnapshot {
    pub session_id: SessionId,
    pub schema_revision: u64,
    pub answers: BTreeMap<FieldId, Answer>,
    pub disclosures: BTreeMap<Disclosure, bool>,
    /// Detail field bound to each disclosure by the schema the session used.
    #[serde(default)]
    pub disclosure_fields: BTreeMap<FieldId, Disclosure>,
}

impl ApplicationSnapshot {
    pub fn answer(&self, field: &str) -> Option<&Answer> {
        self.answers.get(&FieldId::new(field))
    }

    /// Plain text of an answer, `None` when missing or not applicable.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.answer(field)? {
            Answer::NotApplicable => None,
            answer if answer.is_blank() => None,
            answer => Some(answer.display_for(None)),
        }
    }

    /// Every answer as presentation text. Suppressed disclosure details show their
    /// disclosure's absent wording.
    pub fn displayed_answers(&self) -> BTreeMap<FieldId, String> {
        self.answers
            .iter()
            .map(|(id, answer)| {
                let text = match (answer, self.disclosure_fields.get(id)) {
                    (Answer::NotApplicable, Some(disclosure)) => {
                        disclosure.absent_display().to_string()
                    }
                    _ => answer.display_for(None),
                };
                (id.clone(), text)
            })
            .collect()
    }

    pub fn full_name(&self) -> String {
        [self.text("firstName"), self.text("lastName")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One applicant walking through the intake form.
#[derive(Debug, Clone)]
pub struct IntakeSession {
    pub(crate) id: SessionId,
    pub(crate) schema: Arc<FormSchema>,
    pub(crate) step: Step,
    pub(crate) application: Application,
    pub(crate) errors: BTreeSet<FieldId>,
    pub(crate) submission: SubmissionState,
    pub(crate) started_at: DateTime<Utc>,
}

impl IntakeSession {
    pub fn new(schema: Arc<FormSchema>) -> Self {
        Self {
            id: SessionId::new(),
            schema,
            step: Step::Intro,
            application: Application::default(),
            errors: BTreeSet::new(),
            submission: SubmissionState::Idle,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    /// Fields flagged by the last failed validation, still uncorrected.
    pub fn errors(&self) -> &BTreeSet<FieldId> {
        &self.errors
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn snapshot(&self) -> ApplicationSnapshot {
        ApplicationSnapshot {
            session_id: self.id,
            schema_revision: self.schema.revision(),
            answers: self.application.answers.clone(),
            disclosures: Disclosure::ordered()
                .into_iter()
                .filter_map(|disclosure| {
                    self.application
                        .toggle(disclosure)
                        .answer()
                        .map(|answer| (disclosure, answer))
                })
                .collect(),
            disclosure_fields: self
                .schema
                .fields()
                .iter()
                .filter_map(|field| field.disclosure().map(|disclosure| (field.id.clone(), disclosure)))
                .collect(),
        }
    }

    pub fn view(&self) -> IntakeSessionView {
        let fields = self
            .step
            .section()
            .map(|section| self.schema.section_fields(section).cloned().collect())
            .unwrap_or_default();

        IntakeSessionView {
            session_id: self.id,
            step: self.step,
            progress_percent: self.step.progress_percent(),
            schema_revision: self.schema.revision(),
            fields,
            answers: self
                .application
                .answers
                .iter()
                .map(|(id, answer)| (id.clone(), answer.display_for(self.schema.field(id))))
                .collect(),
            toggles: Disclosure::ordered()
                .into_iter()
                .map(|disclosure| (disclosure, self.application.toggle(disclosure)))
                .collect(),
            errors: self.errors.iter().cloned().collect(),
            submission: self.submission.clone(),
            started_at: self.started_at,
        }
    }
}

/// Serializable state handed to the form front end.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeSessionView {
    pub session_id: SessionId,
    pub step: Step,
    pub progress_percent: u8,
    pub schema_revision: u64,
    pub fields: Vec<FormField>,
    pub answers: BTreeMap<FieldId, String>,
    pub toggles: BTreeMap<Disclosure, Toggle>,
    pub errors: Vec<FieldId>,
    pub submission: SubmissionState,
    pub started_at: DateTime<Utc>,
}
