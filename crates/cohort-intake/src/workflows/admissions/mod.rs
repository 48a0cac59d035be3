//! Staff review of submitted registrations: the review state machine, the registration
//! store contract, and outbound notifications.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AdmissionAction, PackageSelection, Registration, RegistrationExit, RegistrationId,
    RegistrationStatus, RegistrationStatusKind, RegistrationView, TransitionError,
};
pub use repository::{
    Notification, NotificationError, NotificationPublisher, RegistrationRepository,
};
pub use router::admissions_router;
pub use service::{AdmissionsError, AdmissionsService, APPLICANT_TEMPLATE, STAFF_TEMPLATE};
