use std::sync::Arc;

use super::error::EnrollmentError;
use super::repository::CohortRepository;
use super::student::{Student, StudentEdit, StudentFilter, StudentId};

/// Per-session attendance and manual student edits.
pub struct AttendanceTracker<R> {
    repository: Arc<R>,
}

impl<R> AttendanceTracker<R>
where
    R: CohortRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Flips the attendance mark of one session.
    pub fn toggle(&self, id: &StudentId, day: usize) -> Result<Student, EnrollmentError> {
        let mut student = self.get(id)?;
        let sessions = student.attendance.len();
        let slot = student
            .attendance
            .get_mut(day)
            .ok_or(EnrollmentError::DayOutOfRange { day, sessions })?;
        *slot = !*slot;
        let present = *slot;

        let expected_version = student.version;
        let stored = self.repository.update_student(student, expected_version)?;
        tracing::debug!(
            student_id = %stored.id,
            day,
            present,
            progress = stored.progress(),
            "attendance toggled"
        );
        Ok(stored)
    }

    pub fn edit(&self, id: &StudentId, edit: StudentEdit) -> Result<Student, EnrollmentError> {
        let mut student = self.get(id)?;
        edit.apply_to(&mut student);

        let expected_version = student.version;
        let stored = self.repository.update_student(student, expected_version)?;
        tracing::info!(student_id = %stored.id, status = stored.status.label(), "student updated");
        Ok(stored)
    }

    pub fn get(&self, id: &StudentId) -> Result<Student, EnrollmentError> {
        self.repository
            .fetch_student(id)?
            .ok_or(EnrollmentError::StudentNotFound(*id))
    }

    /// Students matching the filter, sorted by name.
    pub fn list(&self, filter: &StudentFilter) -> Result<Vec<Student>, EnrollmentError> {
        let mut students: Vec<Student> = self
            .repository
            .list_students()?
            .into_iter()
            .filter(|student| filter.matches(student))
            .collect();
        students.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(students)
    }
}
