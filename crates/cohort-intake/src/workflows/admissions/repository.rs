use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Registration, RegistrationId};
use crate::workflows::persistence::RepositoryError;

/// Storage abstraction for registrations so the workflow can be exercised in isolation.
pub trait RegistrationRepository: Send + Sync {
    fn insert(&self, registration: Registration) -> Result<Registration, RepositoryError>;
    fn fetch(&self, id: &RegistrationId) -> Result<Option<Registration>, RepositoryError>;
    /// Writes the record if the stored version still equals `expected_version` and returns
    /// it with the bumped version.
    fn update(
        &self,
        registration: Registration,
        expected_version: u64,
    ) -> Result<Registration, RepositoryError>;
    fn list(&self) -> Result<Vec<Registration>, RepositoryError>;
}

/// Outbound notification hook (e-mail relay, chat webhook, ...).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub registration_id: RegistrationId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
