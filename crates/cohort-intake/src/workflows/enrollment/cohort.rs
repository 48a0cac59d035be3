use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::EnrollmentError;
use super::repository::CohortRepository;
use super::student::{Student, StudentFilter};

/// Program level a cycle teaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Inicial,
    Avanzado,
    ProgramaLider,
}

impl Level {
    pub const fn ordered() -> [Self; 3] {
        [Self::Inicial, Self::Avanzado, Self::ProgramaLider]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Inicial => "INICIAL",
            Self::Avanzado => "AVANZADO",
            Self::ProgramaLider => "PROGRAMA LIDER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(pub Uuid);

impl CycleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    Upcoming,
    InProgress,
    Completed,
}

impl CycleStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upcoming => "UPCOMING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    /// The only status a cycle may move to from here.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Upcoming => Some(Self::InProgress),
            Self::InProgress => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    pub const fn accepts_enrollment(self) -> bool {
        !matches!(self, Self::Completed)
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDefaults {
    pub capacity: u32,
    pub session_count: u16,
}

/// Capacity and session count applied when a cycle is opened without explicit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortPolicy {
    inicial: LevelDefaults,
    avanzado: LevelDefaults,
    programa_lider: LevelDefaults,
}

impl Default for CohortPolicy {
    fn default() -> Self {
        Self {
            inicial: LevelDefaults {
                capacity: 30,
                session_count: 4,
            },
            avanzado: LevelDefaults {
                capacity: 20,
                session_count: 4,
            },
            programa_lider: LevelDefaults {
                capacity: 20,
                session_count: 4,
            },
        }
    }
}

impl CohortPolicy {
    pub fn with_level(mut self, level: Level, defaults: LevelDefaults) -> Self {
        *self.slot(level) = defaults;
        self
    }

    pub fn defaults_for(&self, level: Level) -> LevelDefaults {
        match level {
            Level::Inicial => self.inicial,
            Level::Avanzado => self.avanzado,
            Level::ProgramaLider => self.programa_lider,
        }
    }

    fn slot(&mut self, level: Level) -> &mut LevelDefaults {
        match level {
            Level::Inicial => &mut self.inicial,
            Level::Avanzado => &mut self.avanzado,
            Level::ProgramaLider => &mut self.programa_lider,
        }
    }
}

/// A dated run of one level's sessions with a fixed number of seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub level: Level,
    pub capacity: u32,
    pub session_count: u16,
    pub enrolled_count: u32,
    pub status: CycleStatus,
    pub version: u64,
}

const MONTHS: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

impl Cycle {
    pub fn seats_left(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled_count)
    }

    pub fn is_full(&self) -> bool {
        self.enrolled_count >= self.capacity
    }

    /// Calendar title such as "Noviembre 2024".
    pub fn title(&self) -> String {
        format!(
            "{} {}",
            MONTHS[self.start_date.month0() as usize],
            self.start_date.year()
        )
    }

    pub fn view(&self) -> CycleView {
        CycleView {
            title: self.title(),
            seats_left: self.seats_left(),
            cycle: self.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleView {
    #[serde(flatten)]
    pub cycle: Cycle,
    pub title: String,
    pub seats_left: u32,
}

/// Request to open a cycle. Capacity falls back to the level default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCycle {
    pub level: Level,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct CycleFilter {
    pub level: Option<Level>,
    pub status: Option<CycleStatus>,
}

impl CycleFilter {
    pub fn matches(&self, cycle: &Cycle) -> bool {
        self.level.map_or(true, |level| cycle.level == level)
            && self.status.map_or(true, |status| cycle.status == status)
    }
}

/// Staff calendar of cycles.
pub struct CohortRegistry<R> {
    repository: Arc<R>,
    policy: CohortPolicy,
}

impl<R> CohortRegistry<R>
where
    R: CohortRepository + 'static,
{
    pub fn new(repository: Arc<R>, policy: CohortPolicy) -> Self {
        Self { repository, policy }
    }

    pub fn policy(&self) -> &CohortPolicy {
        &self.policy
    }

    pub fn create_cycle(
        &self,
        level: Level,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Cycle, EnrollmentError> {
        let capacity = self.policy.defaults_for(level).capacity;
        self.create_cycle_with_capacity(level, start_date, end_date, capacity)
    }

    pub fn create_cycle_with_capacity(
        &self,
        level: Level,
        start_date: NaiveDate,
        end_date: NaiveDate,
        capacity: u32,
    ) -> Result<Cycle, EnrollmentError> {
        if end_date < start_date {
            return Err(EnrollmentError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }
        if capacity == 0 {
            return Err(EnrollmentError::InvalidCapacity);
        }

        let cycle = Cycle {
            id: CycleId::new(),
            start_date,
            end_date,
            level,
            capacity,
            session_count: self.policy.defaults_for(level).session_count,
            enrolled_count: 0,
            status: CycleStatus::Upcoming,
            version: 1,
        };
        let stored = self.repository.insert_cycle(cycle)?;
        tracing::info!(
            cycle_id = %stored.id,
            level = stored.level.label(),
            capacity = stored.capacity,
            "cycle created"
        );
        Ok(stored)
    }

    pub fn open(&self, request: NewCycle) -> Result<Cycle, EnrollmentError> {
        match request.capacity {
            Some(capacity) => self.create_cycle_with_capacity(
                request.level,
                request.start_date,
                request.end_date,
                capacity,
            ),
            None => self.create_cycle(request.level, request.start_date, request.end_date),
        }
    }

    pub fn get(&self, id: &CycleId) -> Result<Cycle, EnrollmentError> {
        self.repository
            .fetch_cycle(id)?
            .ok_or(EnrollmentError::CycleNotFound(*id))
    }

    /// Cycles matching the filter, in calendar order.
    pub fn list(&self, filter: &CycleFilter) -> Result<Vec<Cycle>, EnrollmentError> {
        let mut cycles: Vec<Cycle> = self
            .repository
            .list_cycles()?
            .into_iter()
            .filter(|cycle| filter.matches(cycle))
            .collect();
        cycles.sort_by_key(|cycle| (cycle.start_date, cycle.level));
        Ok(cycles)
    }

    pub fn roster(&self, id: &CycleId) -> Result<Vec<Student>, EnrollmentError> {
        self.get(id)?;
        let filter = StudentFilter {
            cycle_id: Some(*id),
            ..StudentFilter::default()
        };
        let mut students: Vec<Student> = self
            .repository
            .list_students()?
            .into_iter()
            .filter(|student| filter.matches(student))
            .collect();
        students.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(students)
    }

    /// Moves a cycle one status forward.
    pub fn set_status(&self, id: &CycleId, status: CycleStatus) -> Result<Cycle, EnrollmentError> {
        let mut cycle = self.get(id)?;
        if cycle.status.next() != Some(status) {
            return Err(EnrollmentError::InvalidCycleStatus {
                from: cycle.status,
                to: status,
            });
        }

        let expected_version = cycle.version;
        cycle.status = status;
        let stored = self.repository.update_cycle(cycle, expected_version)?;
        tracing::info!(cycle_id = %stored.id, status = stored.status.label(), "cycle status changed");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_status_only_moves_forward_one_step() {
        assert_eq!(CycleStatus::Upcoming.next(), Some(CycleStatus::InProgress));
        assert_eq!(CycleStatus::InProgress.next(), Some(CycleStatus::Completed));
        assert_eq!(CycleStatus::Completed.next(), None);
        assert!(!CycleStatus::Completed.accepts_enrollment());
    }

    #[test]
    fn policy_overrides_single_level() {
        let policy = CohortPolicy::default().with_level(
            Level::ProgramaLider,
            LevelDefaults {
                capacity: 12,
                session_count: 6,
            },
        );
        assert_eq!(policy.defaults_for(Level::ProgramaLider).capacity, 12);
        assert_eq!(policy.defaults_for(Level::Inicial).capacity, 30);
        assert_eq!(policy.defaults_for(Level::Avanzado).session_count, 4);
    }

    #[test]
    fn title_uses_spanish_month() {
        let cycle = Cycle {
            id: CycleId::new(),
            start_date: NaiveDate::from_ymd_opt(2024, 11, 7).expect("valid date"),
            end_date: NaiveDate::from_ymd_opt(2024, 11, 10).expect("valid date"),
            level: Level::Inicial,
            capacity: 30,
            session_count: 4,
            enrolled_count: 29,
            status: CycleStatus::Upcoming,
            version: 1,
        };
        assert_eq!(cycle.title(), "Noviembre 2024");
        assert_eq!(cycle.seats_left(), 1);
        assert!(!cycle.is_full());
    }
}
