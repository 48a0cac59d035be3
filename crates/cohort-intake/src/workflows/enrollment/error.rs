use chrono::NaiveDate;

use super::cohort::{CycleId, CycleStatus};
use super::student::StudentId;
use crate::workflows::admissions::{RegistrationId, TransitionError};
use crate::workflows::persistence::RepositoryError;

/// Error raised by the cohort registry, the converter, and the attendance tracker.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("registration {0} not found")]
    RegistrationNotFound(RegistrationId),
    #[error("cycle {0} not found")]
    CycleNotFound(CycleId),
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("registration {0} is already enrolled")]
    AlreadyEnrolled(RegistrationId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("cycle {cycle_id} is full ({capacity} seats)")]
    CapacityExceeded { cycle_id: CycleId, capacity: u32 },
    #[error("cycle {0} is completed and no longer takes students")]
    CycleClosed(CycleId),
    #[error("cycle cannot end ({end}) before it starts ({start})")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("cycle capacity must be at least one seat")]
    InvalidCapacity,
    #[error("cycle cannot move from {from} to {to}")]
    InvalidCycleStatus { from: CycleStatus, to: CycleStatus },
    #[error("session {day} is outside the {sessions} sessions of this cycle")]
    DayOutOfRange { day: usize, sessions: usize },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
