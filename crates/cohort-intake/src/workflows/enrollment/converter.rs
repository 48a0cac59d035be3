use std::sync::Arc;

use super::cohort::CycleId;
use super::error::EnrollmentError;
use super::repository::{CohortRepository, EnrollmentCommit, EnrollmentLedger, EnrollmentReceipt};
use super::student::Student;
use crate::workflows::admissions::{
    AdmissionAction, RegistrationId, RegistrationRepository, RegistrationStatusKind,
    TransitionError,
};

/// Turns a paid registration into a student seated in a cycle.
pub struct EnrollmentConverter<S> {
    store: Arc<S>,
}

impl<S> EnrollmentConverter<S>
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Every precondition is checked before anything is written; the student, the seat
    /// count, and the registration exit then land in one ledger commit.
    pub fn convert(
        &self,
        registration_id: &RegistrationId,
        cycle_id: &CycleId,
    ) -> Result<EnrollmentReceipt, EnrollmentError> {
        let mut registration = self
            .store
            .fetch(registration_id)?
            .ok_or(EnrollmentError::RegistrationNotFound(*registration_id))?;
        match registration.status.kind() {
            RegistrationStatusKind::PendingPayment => {}
            RegistrationStatusKind::Enrolled => {
                return Err(EnrollmentError::AlreadyEnrolled(*registration_id))
            }
            from => {
                return Err(TransitionError {
                    action: AdmissionAction::Enroll,
                    from,
                }
                .into())
            }
        }

        let mut cycle = self
            .store
            .fetch_cycle(cycle_id)?
            .ok_or(EnrollmentError::CycleNotFound(*cycle_id))?;
        if !cycle.status.accepts_enrollment() {
            return Err(EnrollmentError::CycleClosed(cycle.id));
        }
        if cycle.is_full() {
            return Err(EnrollmentError::CapacityExceeded {
                cycle_id: cycle.id,
                capacity: cycle.capacity,
            });
        }

        let student = Student::enroll(&registration, &cycle);
        let registration_version = registration.version;
        let cycle_version = cycle.version;
        registration.status = registration.status.enroll(student.id, cycle.id)?;
        cycle.enrolled_count += 1;

        let receipt = self.store.commit_enrollment(EnrollmentCommit {
            registration,
            registration_version,
            cycle,
            cycle_version,
            student,
        })?;
        tracing::info!(
            registration_id = %receipt.registration.id,
            student_id = %receipt.student.id,
            cycle_id = %receipt.cycle.id,
            enrolled = receipt.cycle.enrolled_count,
            capacity = receipt.cycle.capacity,
            "registration enrolled"
        );
        Ok(receipt)
    }
}
