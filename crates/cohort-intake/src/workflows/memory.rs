use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::admissions::{Registration, RegistrationId, RegistrationRepository};
use super::enrollment::{
    CohortRepository, Cycle, CycleId, EnrollmentCommit, EnrollmentLedger, EnrollmentReceipt,
    Student, StudentId,
};
use super::persistence::{check_version, RepositoryError};

#[derive(Debug, Default)]
struct StoreState {
    registrations: HashMap<RegistrationId, Registration>,
    cycles: HashMap<CycleId, Cycle>,
    students: HashMap<StudentId, Student>,
}

/// Process-local store behind a single lock. Every call, including an enrollment commit,
/// is checked and applied while holding that lock.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("store mutex poisoned")
    }
}

impl RegistrationRepository for InMemoryStore {
    fn insert(&self, mut registration: Registration) -> Result<Registration, RepositoryError> {
        let mut state = self.state();
        if state.registrations.contains_key(&registration.id) {
            return Err(RepositoryError::Conflict);
        }
        registration.version = 1;
        state
            .registrations
            .insert(registration.id, registration.clone());
        Ok(registration)
    }

    fn fetch(&self, id: &RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        Ok(self.state().registrations.get(id).cloned())
    }

    fn update(
        &self,
        mut registration: Registration,
        expected_version: u64,
    ) -> Result<Registration, RepositoryError> {
        let mut state = self.state();
        let stored = state
            .registrations
            .get_mut(&registration.id)
            .ok_or(RepositoryError::NotFound)?;
        check_version(expected_version, stored.version)?;
        registration.version = expected_version + 1;
        *stored = registration.clone();
        Ok(registration)
    }

    fn list(&self) -> Result<Vec<Registration>, RepositoryError> {
        Ok(self.state().registrations.values().cloned().collect())
    }
}

impl CohortRepository for InMemoryStore {
    fn insert_cycle(&self, mut cycle: Cycle) -> Result<Cycle, RepositoryError> {
        let mut state = self.state();
        if state.cycles.contains_key(&cycle.id) {
            return Err(RepositoryError::Conflict);
        }
        cycle.version = 1;
        state.cycles.insert(cycle.id, cycle.clone());
        Ok(cycle)
    }

    fn fetch_cycle(&self, id: &CycleId) -> Result<Option<Cycle>, RepositoryError> {
        Ok(self.state().cycles.get(id).cloned())
    }

    fn update_cycle(&self, mut cycle: Cycle, expected_version: u64) -> Result<Cycle, RepositoryError> {
        let mut state = self.state();
        let stored = state
            .cycles
            .get_mut(&cycle.id)
            .ok_or(RepositoryError::NotFound)?;
        check_version(expected_version, stored.version)?;
        if cycle.enrolled_count != stored.enrolled_count || cycle.capacity != stored.capacity {
            return Err(RepositoryError::Conflict);
        }
        cycle.version = expected_version + 1;
        *stored = cycle.clone();
        Ok(cycle)
    }

    fn list_cycles(&self) -> Result<Vec<Cycle>, RepositoryError> {
        Ok(self.state().cycles.values().cloned().collect())
    }

    fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        Ok(self.state().students.get(id).cloned())
    }

    fn update_student(
        &self,
        mut student: Student,
        expected_version: u64,
    ) -> Result<Student, RepositoryError> {
        let mut state = self.state();
        let stored = state
            .students
            .get_mut(&student.id)
            .ok_or(RepositoryError::NotFound)?;
        check_version(expected_version, stored.version)?;
        if student.cycle_id != stored.cycle_id
            || student.attendance.len() != stored.attendance.len()
        {
            return Err(RepositoryError::Conflict);
        }
        student.version = expected_version + 1;
        *stored = student.clone();
        Ok(student)
    }

    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        Ok(self.state().students.values().cloned().collect())
    }
}

impl EnrollmentLedger for InMemoryStore {
    fn commit_enrollment(&self, commit: EnrollmentCommit) -> Result<EnrollmentReceipt, RepositoryError> {
        let EnrollmentCommit {
            mut registration,
            registration_version,
            mut cycle,
            cycle_version,
            mut student,
        } = commit;

        let mut state = self.state();
        let stored_registration = state
            .registrations
            .get(&registration.id)
            .ok_or(RepositoryError::NotFound)?;
        check_version(registration_version, stored_registration.version)?;
        let stored_cycle = state.cycles.get(&cycle.id).ok_or(RepositoryError::NotFound)?;
        check_version(cycle_version, stored_cycle.version)?;
        if cycle.enrolled_count != stored_cycle.enrolled_count + 1
            || cycle.enrolled_count > stored_cycle.capacity
            || student.cycle_id != cycle.id
        {
            return Err(RepositoryError::Conflict);
        }
        if state.students.contains_key(&student.id) {
            return Err(RepositoryError::Conflict);
        }

        registration.version = registration_version + 1;
        cycle.version = cycle_version + 1;
        student.version = 1;
        state
            .registrations
            .insert(registration.id, registration.clone());
        state.cycles.insert(cycle.id, cycle.clone());
        state.students.insert(student.id, student.clone());

        Ok(EnrollmentReceipt {
            registration,
            cycle,
            student,
        })
    }
}
