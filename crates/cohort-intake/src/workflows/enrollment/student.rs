use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cohort::{Cycle, CycleId, Level};
use crate::workflows::admissions::{PackageSelection, Registration, RegistrationId};

/// Note stamped on students created from an admission.
pub const ADMISSION_NOTE: &str = "Ingresado desde Admisiones";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub Uuid);

impl StudentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StudentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    Active,
    Conflict,
    Graduated,
    Dropped,
}

impl StudentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Conflict => "CONFLICT",
            Self::Graduated => "GRADUATED",
            Self::Dropped => "DROPPED",
        }
    }
}

/// An enrolled participant bound to exactly one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub cycle_id: CycleId,
    pub registration_id: RegistrationId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub purchased_package: PackageSelection,
    pub current_package: Level,
    pub status: StudentStatus,
    /// One slot per cycle session.
    pub attendance: Vec<bool>,
    /// Whether the student may buy the next level. Opens on graduation.
    pub next_package_locked: bool,
    pub notes: String,
    pub enrolled_at: DateTime<Utc>,
    pub version: u64,
}

impl Student {
    /// Builds the student a registration turns into when seated in `cycle`.
    pub fn enroll(registration: &Registration, cycle: &Cycle) -> Self {
        let snapshot = &registration.snapshot;
        Self {
            id: StudentId::new(),
            cycle_id: cycle.id,
            registration_id: registration.id,
            name: snapshot.full_name(),
            email: snapshot.text("email").unwrap_or_default(),
            phone: snapshot.text("phone").unwrap_or_default(),
            purchased_package: registration.selected_package,
            current_package: cycle.level,
            status: StudentStatus::Active,
            attendance: vec![false; usize::from(cycle.session_count)],
            next_package_locked: true,
            notes: ADMISSION_NOTE.to_string(),
            enrolled_at: Utc::now(),
            version: 1,
        }
    }

    pub fn attended_sessions(&self) -> usize {
        self.attendance.iter().filter(|present| **present).count()
    }

    /// Share of attended sessions, 0 to 100.
    pub fn progress(&self) -> u8 {
        if self.attendance.is_empty() {
            return 0;
        }
        (self.attended_sessions() * 100 / self.attendance.len()) as u8
    }

    pub fn view(&self) -> StudentView {
        StudentView {
            progress: self.progress(),
            student: self.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentView {
    #[serde(flatten)]
    pub student: Student,
    pub progress: u8,
}

/// Manual staff edit. Absent fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StudentEdit {
    pub status: Option<StudentStatus>,
    pub notes: Option<String>,
    pub next_package_locked: Option<bool>,
}

impl StudentEdit {
    /// Applies the edit. Graduating unlocks the next package unless the edit sets the lock.
    pub fn apply_to(self, student: &mut Student) {
        if let Some(status) = self.status {
            if status == StudentStatus::Graduated && student.status != status {
                student.next_package_locked = false;
            }
            student.status = status;
        }
        if let Some(notes) = self.notes {
            student.notes = notes;
        }
        if let Some(locked) = self.next_package_locked {
            student.next_package_locked = locked;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StudentFilter {
    pub cycle_id: Option<CycleId>,
    pub status: Option<StudentStatus>,
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
}

impl StudentFilter {
    pub fn matches(&self, student: &Student) -> bool {
        if self.cycle_id.is_some_and(|cycle_id| student.cycle_id != cycle_id) {
            return false;
        }
        if self.status.is_some_and(|status| student.status != status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                student.name.to_lowercase().contains(&term)
                    || student.email.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}
