use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::attendance::AttendanceTracker;
use super::cohort::{CohortRegistry, Cycle, CycleFilter, CycleId, CycleStatus, NewCycle};
use super::converter::EnrollmentConverter;
use super::error::EnrollmentError;
use super::repository::{CohortRepository, EnrollmentLedger};
use super::student::{Student, StudentEdit, StudentFilter, StudentId};
use crate::workflows::admissions::{RegistrationId, RegistrationRepository};
use crate::workflows::http::{error_response, repository_status};

/// Services shared by the cohort, enrollment, and student routes.
pub struct EnrollmentApi<S> {
    pub registry: Arc<CohortRegistry<S>>,
    pub converter: Arc<EnrollmentConverter<S>>,
    pub attendance: Arc<AttendanceTracker<S>>,
}

impl<S> Clone for EnrollmentApi<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            converter: Arc::clone(&self.converter),
            attendance: Arc::clone(&self.attendance),
        }
    }
}

impl<S> EnrollmentApi<S>
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    pub fn new(registry: CohortRegistry<S>, store: Arc<S>) -> Self {
        Self {
            registry: Arc::new(registry),
            converter: Arc::new(EnrollmentConverter::new(Arc::clone(&store))),
            attendance: Arc::new(AttendanceTracker::new(store)),
        }
    }
}

pub fn enrollment_router<S>(api: EnrollmentApi<S>) -> Router
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    Router::new()
        .route(
            "/api/v1/admissions/registrations/:registration_id/enroll",
            post(enroll_handler::<S>),
        )
        .route(
            "/api/v1/cohorts",
            get(list_cycles_handler::<S>).post(create_cycle_handler::<S>),
        )
        .route("/api/v1/cohorts/:cycle_id", get(cycle_handler::<S>))
        .route("/api/v1/cohorts/:cycle_id/students", get(roster_handler::<S>))
        .route("/api/v1/cohorts/:cycle_id/status", post(cycle_status_handler::<S>))
        .route("/api/v1/students", get(list_students_handler::<S>))
        .route(
            "/api/v1/students/:student_id",
            get(student_handler::<S>).patch(edit_student_handler::<S>),
        )
        .route(
            "/api/v1/students/:student_id/attendance/:day",
            post(attendance_handler::<S>),
        )
        .with_state(api)
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollRequest {
    pub cycle_id: CycleId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CycleStatusRequest {
    pub status: CycleStatus,
}

pub(crate) async fn enroll_handler<S>(
    State(api): State<EnrollmentApi<S>>,
    Path(registration_id): Path<RegistrationId>,
    axum::Json(request): axum::Json<EnrollRequest>,
) -> Response
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    match api.converter.convert(&registration_id, &request.cycle_id) {
        Ok(receipt) => {
            let payload = json!({
                "registration": receipt.registration.view(),
                "cycle": receipt.cycle.view(),
                "student": receipt.student.view(),
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => enrollment_error_response(error),
    }
}

pub(crate) async fn list_cycles_handler<S>(
    State(api): State<EnrollmentApi<S>>,
    Query(filter): Query<CycleFilter>,
) -> Response
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    match api.registry.list(&filter) {
        Ok(cycles) => {
            let views: Vec<_> = cycles.iter().map(Cycle::view).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => enrollment_error_response(error),
    }
}

pub(crate) async fn create_cycle_handler<S>(
    State(api): State<EnrollmentApi<S>>,
    axum::Json(request): axum::Json<NewCycle>,
) -> Response
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    match api.registry.open(request) {
        Ok(cycle) => (StatusCode::CREATED, axum::Json(cycle.view())).into_response(),
        Err(error) => enrollment_error_response(error),
    }
}

pub(crate) async fn cycle_handler<S>(
    State(api): State<EnrollmentApi<S>>,
    Path(cycle_id): Path<CycleId>,
) -> Response
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    cycle_response(api.registry.get(&cycle_id))
}

pub(crate) async fn roster_handler<S>(
    State(api): State<EnrollmentApi<S>>,
    Path(cycle_id): Path<CycleId>,
) -> Response
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    students_response(api.registry.roster(&cycle_id))
}

pub(crate) async fn cycle_status_handler<S>(
    State(api): State<EnrollmentApi<S>>,
    Path(cycle_id): Path<CycleId>,
    axum::Json(request): axum::Json<CycleStatusRequest>,
) -> Response
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    cycle_response(api.registry.set_status(&cycle_id, request.status))
}

pub(crate) async fn list_students_handler<S>(
    State(api): State<EnrollmentApi<S>>,
    Query(filter): Query<StudentFilter>,
) -> Response
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    students_response(api.attendance.list(&filter))
}

pub(crate) async fn student_handler<S>(
    State(api): State<EnrollmentApi<S>>,
    Path(student_id): Path<StudentId>,
) -> Response
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    student_response(api.attendance.get(&student_id))
}

pub(crate) async fn edit_student_handler<S>(
    State(api): State<EnrollmentApi<S>>,
    Path(student_id): Path<StudentId>,
    axum::Json(edit): axum::Json<StudentEdit>,
) -> Response
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    student_response(api.attendance.edit(&student_id, edit))
}

pub(crate) async fn attendance_handler<S>(
    State(api): State<EnrollmentApi<S>>,
    Path((student_id, day)): Path<(StudentId, usize)>,
) -> Response
where
    S: RegistrationRepository + CohortRepository + EnrollmentLedger + 'static,
{
    student_response(api.attendance.toggle(&student_id, day))
}

fn cycle_response(outcome: Result<Cycle, EnrollmentError>) -> Response {
    match outcome {
        Ok(cycle) => (StatusCode::OK, axum::Json(cycle.view())).into_response(),
        Err(error) => enrollment_error_response(error),
    }
}

fn student_response(outcome: Result<Student, EnrollmentError>) -> Response {
    match outcome {
        Ok(student) => (StatusCode::OK, axum::Json(student.view())).into_response(),
        Err(error) => enrollment_error_response(error),
    }
}

fn students_response(outcome: Result<Vec<Student>, EnrollmentError>) -> Response {
    match outcome {
        Ok(students) => {
            let views: Vec<_> = students.iter().map(Student::view).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => enrollment_error_response(error),
    }
}

fn enrollment_error_response(error: EnrollmentError) -> Response {
    let status = match &error {
        EnrollmentError::RegistrationNotFound(_)
        | EnrollmentError::CycleNotFound(_)
        | EnrollmentError::StudentNotFound(_) => StatusCode::NOT_FOUND,
        EnrollmentError::AlreadyEnrolled(_)
        | EnrollmentError::Transition(_)
        | EnrollmentError::CapacityExceeded { .. }
        | EnrollmentError::CycleClosed(_)
        | EnrollmentError::InvalidCycleStatus { .. } => StatusCode::CONFLICT,
        EnrollmentError::InvalidDateRange { .. }
        | EnrollmentError::InvalidCapacity
        | EnrollmentError::DayOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EnrollmentError::Repository(repository) => repository_status(repository),
    };
    error_response(status, error.to_string())
}
