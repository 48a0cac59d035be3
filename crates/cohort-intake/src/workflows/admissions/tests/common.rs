use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::admissions::{
    AdmissionsService, Notification, NotificationError, NotificationPublisher, Registration,
    RegistrationId, RegistrationRepository,
};
use crate::workflows::intake::{Answer, ApplicationSnapshot, Disclosure, FieldId, SessionId};
use crate::workflows::{InMemoryStore, RepositoryError};

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
    answers.insert(FieldId::new("allergies"), Answer::NotApplicable);
    answers.insert(FieldId::new("selectedPackage"), Answer::choice(package));

    let disclosures = Disclosure::ordered()
        .into_iter()
        .map(|disclosure| (disclosure, false))
        .collect();

    ApplicationSnapshot {
        session_id: SessionId::new(),
        schema_revision: 1,
        answers,
        disclosures,
        disclosure_fields: Disclosure::ordered()
            .into_iter()
            .map(|disclosure| (FieldId::new(disclosure.detail_field()), disclosure))
            .collect(),
    }
}

pub(super) fn build_service() -> (
    AdmissionsService<InMemoryStore, MemoryNotifications>,
    Arc<InMemoryStore>,
    Arc<MemoryNotifications>,
) {
    let store = Arc::new(InMemoryStore::new());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = AdmissionsService::new(store.clone(), notifications.clone());
    (service, store, notifications)
}

#[derive(Default)]
pub(super) struct MemoryNotifications {
    events: Mutex<Vec<Notification>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct OfflineNotifications;

impl NotificationPublisher for OfflineNotifications {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

/// Store whose every update loses the race against another writer.
#[derive(Default)]
pub(super) struct StaleRepository {
    pub(super) inner: InMemoryStore,
}

impl RegistrationRepository for StaleRepository {
    fn insert(&self, registration: Registration) -> Result<Registration, RepositoryError> {
        self.inner.insert(registration)
    }

    fn fetch(&self, id: &RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn update(
        &self,
        _registration: Registration,
        expected_version: u64,
    ) -> Result<Registration, RepositoryError> {
        Err(RepositoryError::VersionConflict {
            expected: expected_version,
            found: expected_version + 1,
        })
    }

    fn list(&self) -> Result<Vec<Registration>, RepositoryError> {
        self.inner.list()
    }
}

pub(super) struct UnavailableRepository;

impl RegistrationRepository for UnavailableRepository {
    fn insert(&self, _registration: Registration) -> Result<Registration, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(
        &self,
        _registration: Registration,
        _expected_version: u64,
    ) -> Result<Registration, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Registration>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
