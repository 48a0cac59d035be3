use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::admissions::AdmissionsError;
use crate::workflows::enrollment::EnrollmentError;
use crate::workflows::intake::{AnswerError, IntakeError};

/// Failure of a binary entry point. HTTP handlers map workflow errors themselves.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("intake failed: {0}")]
    Intake(#[from] IntakeError),
    #[error("admissions failed: {0}")]
    Admissions(#[from] AdmissionsError),
    #[error("enrollment failed: {0}")]
    Enrollment(#[from] EnrollmentError),
    #[error("demo run failed: {0}")]
    Demo(String),
}

impl From<AnswerError> for AppError {
    fn from(value: AnswerError) -> Self {
        Self::Intake(value.into())
    }
}
