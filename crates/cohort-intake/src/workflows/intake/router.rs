use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::answer::{Answer, AnswerError};
use super::engine::{ApplicationSink, IntakeError};
use super::schema::{Disclosure, FieldId, FieldUpdate, FormField, SchemaError};
use super::service::IntakeService;
use super::session::{SessionId, Toggle};
use crate::workflows::http::error_response;

/// Router exposing the schema editor and applicant sessions.
pub fn intake_router<S>(service: Arc<IntakeService<S>>) -> Router
where
    S: ApplicationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/intake/schema/fields",
            get(list_fields_handler::<S>).post(add_field_handler::<S>),
        )
        .route(
            "/api/v1/intake/schema/fields/:field_id",
            patch(update_field_handler::<S>).delete(remove_field_handler::<S>),
        )
        .route(
            "/api/v1/intake/schema/fields/:field_id/position",
            put(move_field_handler::<S>),
        )
        .route("/api/v1/intake/sessions", post(start_handler::<S>))
        .route("/api/v1/intake/sessions/:session_id", get(session_handler::<S>))
        .route(
            "/api/v1/intake/sessions/:session_id/answers/:field_id",
            put(answer_handler::<S>).delete(clear_answer_handler::<S>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/toggles/:disclosure",
            put(toggle_handler::<S>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/advance",
            post(advance_handler::<S>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/retreat",
            post(retreat_handler::<S>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/submit",
            post(submit_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct PositionRequest {
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToggleRequest {
    pub value: Toggle,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    pub consent: bool,
}

pub(crate) async fn list_fields_handler<S>(State(service): State<Arc<IntakeService<S>>>) -> Response
where
    S: ApplicationSink + 'static,
{
    let schema = service.registry().snapshot();
    let payload = json!({
        "revision": schema.revision(),
        "fields": schema.fields(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn add_field_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    axum::Json(field): axum::Json<FormField>,
) -> Response
where
    S: ApplicationSink + 'static,
{
    match service.registry().add_field(field) {
        Ok(field) => (StatusCode::CREATED, axum::Json(field)).into_response(),
        Err(error) => schema_error_response(error),
    }
}

pub(crate) async fn update_field_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    Path(field_id): Path<String>,
    axum::Json(update): axum::Json<FieldUpdate>,
) -> Response
where
    S: ApplicationSink + 'static,
{
    match service
        .registry()
        .update_field(&FieldId::new(field_id), update)
    {
        Ok(field) => (StatusCode::OK, axum::Json(field)).into_response(),
        Err(error) => schema_error_response(error),
    }
}

pub(crate) async fn remove_field_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    Path(field_id): Path<String>,
) -> Response
where
    S: ApplicationSink + 'static,
{
    match service.registry().remove_field(&FieldId::new(field_id)) {
        Ok(field) => (StatusCode::OK, axum::Json(field)).into_response(),
        Err(error) => schema_error_response(error),
    }
}

pub(crate) async fn move_field_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    Path(field_id): Path<String>,
    axum::Json(request): axum::Json<PositionRequest>,
) -> Response
where
    S: ApplicationSink + 'static,
{
    match service
        .registry()
        .move_field(&FieldId::new(field_id), request.index)
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => schema_error_response(error),
    }
}

pub(crate) async fn start_handler<S>(State(service): State<Arc<IntakeService<S>>>) -> Response
where
    S: ApplicationSink + 'static,
{
    (StatusCode::CREATED, axum::Json(service.start())).into_response()
}

pub(crate) async fn session_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    Path(session_id): Path<SessionId>,
) -> Response
where
    S: ApplicationSink + 'static,
{
    session_response(service.view(session_id))
}

pub(crate) async fn answer_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    Path((session_id, field_id)): Path<(SessionId, String)>,
    axum::Json(answer): axum::Json<Answer>,
) -> Response
where
    S: ApplicationSink + 'static,
{
    session_response(service.set_answer(session_id, &FieldId::new(field_id), answer))
}

pub(crate) async fn clear_answer_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    Path((session_id, field_id)): Path<(SessionId, String)>,
) -> Response
where
    S: ApplicationSink + 'static,
{
    session_response(service.clear_answer(session_id, &FieldId::new(field_id)))
}

pub(crate) async fn toggle_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    Path((session_id, disclosure)): Path<(SessionId, Disclosure)>,
    axum::Json(request): axum::Json<ToggleRequest>,
) -> Response
where
    S: ApplicationSink + 'static,
{
    session_response(service.set_toggle(session_id, disclosure, request.value))
}

pub(crate) async fn advance_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    Path(session_id): Path<SessionId>,
) -> Response
where
    S: ApplicationSink + 'static,
{
    session_response(service.advance(session_id))
}

pub(crate) async fn retreat_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    Path(session_id): Path<SessionId>,
) -> Response
where
    S: ApplicationSink + 'static,
{
    session_response(service.retreat(session_id))
}

pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<IntakeService<S>>>,
    Path(session_id): Path<SessionId>,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    S: ApplicationSink + 'static,
{
    match service.submit(session_id, request.consent) {
        Ok(receipt) => (StatusCode::ACCEPTED, axum::Json(receipt)).into_response(),
        Err(error) => intake_error_response(error),
    }
}

fn session_response<T: serde::Serialize>(outcome: Result<T, IntakeError>) -> Response {
    match outcome {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => intake_error_response(error),
    }
}

fn intake_error_response(error: IntakeError) -> Response {
    match error {
        IntakeError::Validation(validation) => {
            let payload = json!({
                "error": validation.to_string(),
                "validation": validation,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        IntakeError::SessionNotFound(_) | IntakeError::Answer(AnswerError::UnknownField(_)) => {
            error_response(StatusCode::NOT_FOUND, error.to_string())
        }
        IntakeError::Answer(AnswerError::Suppressed(_))
        | IntakeError::CannotAdvance(_)
        | IntakeError::NotAtPayment(_)
        | IntakeError::SubmissionInFlight
        | IntakeError::SessionClosed => error_response(StatusCode::CONFLICT, error.to_string()),
        IntakeError::Answer(_) | IntakeError::ConsentRequired => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        IntakeError::Persistence(_) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, error.to_string())
        }
    }
}

fn schema_error_response(error: SchemaError) -> Response {
    let status = match error {
        SchemaError::UnknownField(_) => StatusCode::NOT_FOUND,
        SchemaError::DuplicateField(_)
        | SchemaError::DuplicateDisclosure(_)
        | SchemaError::ProtectedField { .. } => StatusCode::CONFLICT,
        SchemaError::BlankId
        | SchemaError::MissingOptions(_)
        | SchemaError::PositionOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    error_response(status, error.to_string())
}
