use std::collections::BTreeMap;
use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::admissions::{
    Registration, RegistrationId, RegistrationRepository, RegistrationStatus,
};
use crate::workflows::enrollment::{
    CohortPolicy, CohortRegistry, CohortRepository, Cycle, CycleId, EnrollmentApi,
    EnrollmentCommit, EnrollmentLedger, EnrollmentReceipt, Level, Student, StudentId,
};
use crate::workflows::intake::{Answer, ApplicationSnapshot, Disclosure, FieldId, SessionId};
use crate::workflows::{InMemoryStore, RepositoryError};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn snapshot(first_name: &str, package: &str) -> ApplicationSnapshot {
    let mut answers = BTreeMap::new();
    answers.insert(FieldId::new("firstName"), Answer::text(first_name));
    answers.insert(FieldId::new("lastName"), Answer::text("Garcia"));
    answers.insert(
        FieldId::new("email"),
        Answer::text(&format!("{}@example.com", first_name.to_lowercase())),
    );
    answers.insert(
        FieldId::new("phone"),
        Answer::phone("351 555 0101").expect("valid phone"),
    );
    answers.insert(FieldId::new("selectedPackage"), Answer::choice(package));

    ApplicationSnapshot {
        session_id: SessionId::new(),
        schema_revision: 1,
        answers,
        disclosures: Disclosure::ordered()
            .into_iter()
            .map(|disclosure| (disclosure, false))
            .collect(),
        disclosure_fields: Disclosure::ordered()
            .into_iter()
            .map(|disclosure| (FieldId::new(disclosure.detail_field()), disclosure))
            .collect(),
    }
}

pub(super) fn build_api() -> (EnrollmentApi<InMemoryStore>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let registry = CohortRegistry::new(Arc::clone(&store), CohortPolicy::default());
    (EnrollmentApi::new(registry, Arc::clone(&store)), store)
}

/// Stores a registration and moves it to pending payment, as an approval would.
pub(super) fn paid_registration<S>(store: &S, first_name: &str) -> Registration
where
    S: RegistrationRepository,
{
    let registration = store
        .insert(Registration::new(snapshot(first_name, "AVANZADO")))
        .expect("insert succeeds");
    let mut approved = registration.clone();
    approved.status = RegistrationStatus::PendingPayment;
    store
        .update(approved, registration.version)
        .expect("approval lands")
}

pub(super) fn open_cycle(api: &EnrollmentApi<InMemoryStore>, capacity: u32) -> Cycle {
    api.registry
        .create_cycle_with_capacity(Level::Avanzado, date(2024, 11, 7), date(2024, 11, 10), capacity)
        .expect("cycle opens")
}

/// Store where another writer always moves the cycle just before a conversion commits.
#[derive(Default)]
pub(super) struct RacingStore {
    pub(super) inner: InMemoryStore,
}

impl RegistrationRepository for RacingStore {
    fn insert(&self, registration: Registration) -> Result<Registration, RepositoryError> {
        self.inner.insert(registration)
    }

    fn fetch(&self, id: &RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn update(
        &self,
        registration: Registration,
        expected_version: u64,
    ) -> Result<Registration, RepositoryError> {
        self.inner.update(registration, expected_version)
    }

    fn list(&self) -> Result<Vec<Registration>, RepositoryError> {
        self.inner.list()
    }
}

impl CohortRepository for RacingStore {
    fn insert_cycle(&self, cycle: Cycle) -> Result<Cycle, RepositoryError> {
        self.inner.insert_cycle(cycle)
    }

    fn fetch_cycle(&self, id: &CycleId) -> Result<Option<Cycle>, RepositoryError> {
        self.inner.fetch_cycle(id)
    }

    fn update_cycle(&self, cycle: Cycle, expected_version: u64) -> Result<Cycle, RepositoryError> {
        self.inner.update_cycle(cycle, expected_version)
    }

    fn list_cycles(&self) -> Result<Vec<Cycle>, RepositoryError> {
        self.inner.list_cycles()
    }

    fn fetch_student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        self.inner.fetch_student(id)
    }

    fn update_student(
        &self,
        student: Student,
        expected_version: u64,
    ) -> Result<Student, RepositoryError> {
        self.inner.update_student(student, expected_version)
    }

    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        self.inner.list_students()
    }
}

impl EnrollmentLedger for RacingStore {
    fn commit_enrollment(&self, commit: EnrollmentCommit) -> Result<EnrollmentReceipt, RepositoryError> {
        let current = self
            .inner
            .fetch_cycle(&commit.cycle.id)?
            .ok_or(RepositoryError::NotFound)?;
        let version = current.version;
        self.inner.update_cycle(current, version)?;
        self.inner.commit_enrollment(commit)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
