use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::domain::{Registration, RegistrationId, RegistrationStatusKind, RegistrationView};
use super::repository::{NotificationPublisher, RegistrationRepository};
use super::service::{AdmissionsError, AdmissionsService};
use crate::workflows::http::{error_response, repository_status};

/// Router for the staff admissions queue.
pub fn admissions_router<R, N>(service: Arc<AdmissionsService<R, N>>) -> Router
where
    R: RegistrationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/admissions/registrations",
            get(list_handler::<R, N>),
        )
        .route(
            "/api/v1/admissions/registrations/:registration_id",
            get(get_handler::<R, N>),
        )
        .route(
            "/api/v1/admissions/registrations/:registration_id/approve",
            post(approve_handler::<R, N>),
        )
        .route(
            "/api/v1/admissions/registrations/:registration_id/reject",
            post(reject_handler::<R, N>),
        )
        .route(
            "/api/v1/admissions/registrations/:registration_id/restore",
            post(restore_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    pub status: Option<RegistrationStatusKind>,
}

pub(crate) async fn list_handler<R, N>(
    State(service): State<Arc<AdmissionsService<R, N>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.list(query.status) {
        Ok(registrations) => {
            let views: Vec<RegistrationView> = registrations.iter().map(Registration::view).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => admissions_error_response(error),
    }
}

pub(crate) async fn get_handler<R, N>(
    State(service): State<Arc<AdmissionsService<R, N>>>,
    Path(registration_id): Path<RegistrationId>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    registration_response(service.get(&registration_id))
}

pub(crate) async fn approve_handler<R, N>(
    State(service): State<Arc<AdmissionsService<R, N>>>,
    Path(registration_id): Path<RegistrationId>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    registration_response(service.approve(&registration_id))
}

pub(crate) async fn reject_handler<R, N>(
    State(service): State<Arc<AdmissionsService<R, N>>>,
    Path(registration_id): Path<RegistrationId>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    registration_response(service.reject(&registration_id))
}

pub(crate) async fn restore_handler<R, N>(
    State(service): State<Arc<AdmissionsService<R, N>>>,
    Path(registration_id): Path<RegistrationId>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    registration_response(service.restore(&registration_id))
}

fn registration_response(outcome: Result<Registration, AdmissionsError>) -> Response {
    match outcome {
        Ok(registration) => (StatusCode::OK, axum::Json(registration.view())).into_response(),
        Err(error) => admissions_error_response(error),
    }
}

fn admissions_error_response(error: AdmissionsError) -> Response {
    let status = match &error {
        AdmissionsError::NotFound(_) => StatusCode::NOT_FOUND,
        AdmissionsError::Transition(_) => StatusCode::CONFLICT,
        AdmissionsError::Repository(repository) => repository_status(repository),
    };
    error_response(status, error.to_string())
}
