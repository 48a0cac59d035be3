use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::enrollment::{CycleId, StudentId};
use crate::workflows::intake::{ApplicationSnapshot, FieldId, PACKAGE_FIELD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(pub Uuid);

impl RegistrationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Package the applicant chose on the payment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PackageSelection {
    #[default]
    #[serde(rename = "INICIAL")]
    Inicial,
    #[serde(rename = "AVANZADO")]
    Avanzado,
    #[serde(rename = "PROGRAMA LIDER")]
    ProgramaLider,
    #[serde(rename = "COMBO INICIAL+AVANZADO")]
    ComboInicialAvanzado,
    #[serde(rename = "FULL EXPERIENCE")]
    FullExperience,
}

impl PackageSelection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inicial => "INICIAL",
            Self::Avanzado => "AVANZADO",
            Self::ProgramaLider => "PROGRAMA LIDER",
            Self::ComboInicialAvanzado => "COMBO INICIAL+AVANZADO",
            Self::FullExperience => "FULL EXPERIENCE",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [
            Self::Inicial,
            Self::Avanzado,
            Self::ProgramaLider,
            Self::ComboInicialAvanzado,
            Self::FullExperience,
        ]
        .into_iter()
        .find(|package| package.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// Why a registration left the review queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationExit {
    /// Soft delete; staff can restore it.
    Deleted,
    /// Converted into a student. Terminal.
    Enrolled {
        student_id: StudentId,
        cycle_id: CycleId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    PendingReview,
    PendingPayment,
    Exited { exit: RegistrationExit },
}

/// Flat status label used for filtering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatusKind {
    PendingReview,
    PendingPayment,
    Deleted,
    Enrolled,
}

impl RegistrationStatusKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingReview => "PENDING_REVIEW",
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Deleted => "DELETED",
            Self::Enrolled => "ENROLLED",
        }
    }
}

impl fmt::Display for RegistrationStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Staff decision applied to a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionAction {
    Approve,
    Reject,
    Restore,
    Enroll,
}

impl AdmissionAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Restore => "restore",
            Self::Enroll => "enroll",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {} a registration in {from} state", .action.label())]
pub struct TransitionError {
    pub action: AdmissionAction,
    pub from: RegistrationStatusKind,
}

impl RegistrationStatus {
    pub const fn kind(&self) -> RegistrationStatusKind {
        match self {
            Self::PendingReview => RegistrationStatusKind::PendingReview,
            Self::PendingPayment => RegistrationStatusKind::PendingPayment,
            Self::Exited {
                exit: RegistrationExit::Deleted,
            } => RegistrationStatusKind::Deleted,
            Self::Exited {
                exit: RegistrationExit::Enrolled { .. },
            } => RegistrationStatusKind::Enrolled,
        }
    }

    /// Next status for a review decision. Enrollment goes through [`Self::enroll`].
    pub fn apply(&self, action: AdmissionAction) -> Result<Self, TransitionError> {
        match (self, action) {
            (Self::PendingReview, AdmissionAction::Approve) => Ok(Self::PendingPayment),
            (Self::PendingReview, AdmissionAction::Reject) => Ok(Self::Exited {
                exit: RegistrationExit::Deleted,
            }),
            (
                Self::Exited {
                    exit: RegistrationExit::Deleted,
                },
                AdmissionAction::Restore,
            ) => Ok(Self::PendingReview),
            _ => Err(TransitionError {
                action,
                from: self.kind(),
            }),
        }
    }

    pub fn enroll(&self, student_id: StudentId, cycle_id: CycleId) -> Result<Self, TransitionError> {
        match self {
            Self::PendingPayment => Ok(Self::Exited {
                exit: RegistrationExit::Enrolled {
                    student_id,
                    cycle_id,
                },
            }),
            _ => Err(TransitionError {
                action: AdmissionAction::Enroll,
                from: self.kind(),
            }),
        }
    }
}

/// A submitted application awaiting staff decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub snapshot: ApplicationSnapshot,
    pub selected_package: PackageSelection,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Registration {
    pub fn new(snapshot: ApplicationSnapshot) -> Self {
        let selected_package = snapshot
            .text(PACKAGE_FIELD)
            .and_then(|label| PackageSelection::from_label(&label))
            .unwrap_or_default();

        Self {
            id: RegistrationId::new(),
            snapshot,
            selected_package,
            status: RegistrationStatus::PendingReview,
            created_at: Utc::now(),
            version: 1,
        }
    }

    pub fn view(&self) -> RegistrationView {
        RegistrationView {
            id: self.id,
            full_name: self.snapshot.full_name(),
            email: self.snapshot.text("email"),
            phone: self.snapshot.text("phone"),
            selected_package: self.selected_package,
            status: self.status.kind(),
            exit: match self.status {
                RegistrationStatus::Exited { exit } => Some(exit),
                _ => None,
            },
            answers: self.snapshot.displayed_answers(),
            created_at: self.created_at,
            version: self.version,
        }
    }
}

/// Staff-facing projection of a registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationView {
    pub id: RegistrationId,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub selected_package: PackageSelection,
    pub status: RegistrationStatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<RegistrationExit>,
    pub answers: BTreeMap<FieldId, String>,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}
