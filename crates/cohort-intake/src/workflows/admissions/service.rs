use std::collections::BTreeMap;
use std::sync::Arc;

use super::domain::{
    AdmissionAction, Registration, RegistrationId, RegistrationStatusKind, TransitionError,
};
use super::repository::{Notification, NotificationPublisher, RegistrationRepository};
use crate::workflows::intake::{ApplicationSink, ApplicationSnapshot, SubmissionReceipt};
use crate::workflows::persistence::RepositoryError;

pub const STAFF_TEMPLATE: &str = "registration_received";
pub const APPLICANT_TEMPLATE: &str = "application_acknowledged";

/// Staff review of submitted registrations.
pub struct AdmissionsService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
}

impl<R, N> AdmissionsService<R, N>
where
    R: RegistrationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>) -> Self {
        Self {
            repository,
            notifications,
        }
    }

    /// Stores a submitted application for review, then notifies staff and the applicant.
    pub fn submit(&self, snapshot: ApplicationSnapshot) -> Result<Registration, AdmissionsError> {
        let stored = self.repository.insert(Registration::new(snapshot))?;
        tracing::info!(
            registration_id = %stored.id,
            package = stored.selected_package.label(),
            "registration received"
        );
        self.notify(&stored);
        Ok(stored)
    }

    pub fn approve(&self, id: &RegistrationId) -> Result<Registration, AdmissionsError> {
        self.transition(id, AdmissionAction::Approve)
    }

    pub fn reject(&self, id: &RegistrationId) -> Result<Registration, AdmissionsError> {
        self.transition(id, AdmissionAction::Reject)
    }

    pub fn restore(&self, id: &RegistrationId) -> Result<Registration, AdmissionsError> {
        self.transition(id, AdmissionAction::Restore)
    }

    /// Registrations in the given status, newest first. Without a filter, the open queue
    /// (pending review and pending payment) is returned.
    pub fn list(
        &self,
        status: Option<RegistrationStatusKind>,
    ) -> Result<Vec<Registration>, AdmissionsError> {
        let mut registrations: Vec<Registration> = self
            .repository
            .list()?
            .into_iter()
            .filter(|registration| match status {
                Some(kind) => registration.status.kind() == kind,
                None => matches!(
                    registration.status.kind(),
                    RegistrationStatusKind::PendingReview | RegistrationStatusKind::PendingPayment
                ),
            })
            .collect();
        registrations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(registrations)
    }

    pub fn get(&self, id: &RegistrationId) -> Result<Registration, AdmissionsError> {
        self.repository
            .fetch(id)?
            .ok_or(AdmissionsError::NotFound(*id))
    }

    fn transition(
        &self,
        id: &RegistrationId,
        action: AdmissionAction,
    ) -> Result<Registration, AdmissionsError> {
        let mut registration = self.get(id)?;
        let from = registration.status.kind();
        let expected_version = registration.version;
        registration.status = registration.status.apply(action)?;

        let stored = self.repository.update(registration, expected_version)?;
        tracing::info!(
            registration_id = %stored.id,
            action = action.label(),
            from = from.label(),
            to = stored.status.kind().label(),
            "registration status changed"
        );
        Ok(stored)
    }

    fn notify(&self, registration: &Registration) {
        let snapshot = &registration.snapshot;
        let mut staff = BTreeMap::new();
        staff.insert("name".to_string(), snapshot.full_name());
        staff.insert("package".to_string(), registration.selected_package.label().to_string());
        if let Some(email) = snapshot.text("email") {
            staff.insert("email".to_string(), email);
        }
        if let Some(phone) = snapshot.text("phone") {
            staff.insert("phone".to_string(), phone);
        }

        let mut applicant = BTreeMap::new();
        if let Some(first_name) = snapshot.text("firstName") {
            applicant.insert("first_name".to_string(), first_name);
        }
        if let Some(email) = snapshot.text("email") {
            applicant.insert("to".to_string(), email);
        }

        for (template, details) in [(STAFF_TEMPLATE, staff), (APPLICANT_TEMPLATE, applicant)] {
            let notification = Notification {
                template: template.to_string(),
                registration_id: registration.id,
                details,
            };
            if let Err(error) = self.notifications.publish(notification) {
                tracing::warn!(
                    registration_id = %registration.id,
                    template,
                    error = %error,
                    "registration notification failed"
                );
            }
        }
    }
}

impl<R, N> ApplicationSink for AdmissionsService<R, N>
where
    R: RegistrationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    type Error = AdmissionsError;

    fn persist(&self, snapshot: ApplicationSnapshot) -> Result<SubmissionReceipt, Self::Error> {
        let registration = self.submit(snapshot)?;
        Ok(SubmissionReceipt {
            registration_id: registration.id,
            submitted_at: registration.created_at,
        })
    }
}

/// Error raised by the admissions workflow.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionsError {
    #[error("registration {0} not found")]
    NotFound(RegistrationId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
