use chrono::NaiveDate;
use cohort_intake::config::CohortConfig;
use cohort_intake::workflows::admissions::{
    AdmissionsService, Notification, NotificationError, NotificationPublisher,
};
use cohort_intake::workflows::enrollment::{CohortRegistry, EnrollmentApi};
use cohort_intake::workflows::intake::{FormSchemaRegistry, IntakeService};
use cohort_intake::workflows::InMemoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type Admissions = AdmissionsService<InMemoryStore, TracingNotificationPublisher>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Writes outbound notifications to the log instead of a mail relay.
#[derive(Default, Clone)]
pub(crate) struct TracingNotificationPublisher;

impl NotificationPublisher for TracingNotificationPublisher {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            registration_id = %notification.registration_id,
            details = ?notification.details,
            "notification dispatched"
        );
        Ok(())
    }
}

/// The three workflows wired over one shared store.
pub(crate) struct Workflows {
    pub(crate) admissions: Arc<Admissions>,
    pub(crate) intake: Arc<IntakeService<Admissions>>,
    pub(crate) enrollment: EnrollmentApi<InMemoryStore>,
}

impl Workflows {
    pub(crate) fn in_memory(cohorts: &CohortConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let admissions = Arc::new(AdmissionsService::new(
            Arc::clone(&store),
            Arc::new(TracingNotificationPublisher),
        ));
        let intake = Arc::new(IntakeService::new(
            Arc::new(FormSchemaRegistry::default()),
            Arc::clone(&admissions),
        ));
        let enrollment = EnrollmentApi::new(
            CohortRegistry::new(Arc::clone(&store), cohorts.policy()),
            Arc::clone(&store),
        );

        Self {
            admissions,
            intake,
            enrollment,
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
