use serde::Serialize;

use super::cohort::{Cycle, CycleId};
use super::student::{Student, StudentId};
use crate::workflows::admissions::Registration;
use crate::workflows::persistence::RepositoryError;

/// Storage for cycles and students. Updates carry the version the caller read.
pub trait CohortRepository: Send + Sync {
    fn insert_cycle(&self, cycle: Cycle) -> Result<Cycle, RepositoryError>;
    fn fetch_cycle(&self, id: &CycleId) -> Result<Option<Cycle>, RepositoryError>;
    fn update_cycle(&self, cycle: Cycle, expected_version: u64) -> Result<Cycle, RepositoryError>;
    fn list_cycles(&self) -> Result<Vec<Cycle>, RepositoryError>;

    fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError>;
    fn update_student(
        &self,
        student: Student,
        expected_version: u64,
    ) -> Result<Student, RepositoryError>;
    fn list_students(&self) -> Result<Vec<Student>, RepositoryError>;
}

/// Everything one conversion writes, with the versions it was computed from.
#[derive(Debug, Clone)]
pub struct EnrollmentCommit {
    pub registration: Registration,
    pub registration_version: u64,
    pub cycle: Cycle,
    pub cycle_version: u64,
    pub student: Student,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentReceipt {
    pub registration: Registration,
    pub cycle: Cycle,
    pub student: Student,
}

/// Applies a conversion as a single unit: either the student, the seat count and the
/// registration exit are all stored, or none of them is.
pub trait EnrollmentLedger: Send + Sync {
    fn commit_enrollment(&self, commit: EnrollmentCommit) -> Result<EnrollmentReceipt, RepositoryError>;
}
