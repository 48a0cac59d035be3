//! Cohort calendar, registration-to-student conversion, and attendance.

pub mod attendance;
pub mod cohort;
pub mod converter;
pub mod error;
pub mod repository;
pub mod router;
pub mod student;

#[cfg(test)]
mod tests;

pub use attendance::AttendanceTracker;
pub use cohort::{
    CohortPolicy, CohortRegistry, Cycle, CycleFilter, CycleId, CycleStatus, CycleView, Level,
    LevelDefaults, NewCycle,
};
pub use converter::EnrollmentConverter;
pub use error::EnrollmentError;
pub use repository::{CohortRepository, EnrollmentCommit, EnrollmentLedger, EnrollmentReceipt};
pub use router::{enrollment_router, EnrollmentApi};
pub use student::{
    Student, StudentEdit, StudentFilter, StudentId, StudentStatus, StudentView, ADMISSION_NOTE,
};
