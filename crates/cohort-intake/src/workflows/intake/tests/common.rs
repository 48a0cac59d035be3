use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::workflows::admissions::RegistrationId;
use crate::workflows::intake::{
    Answer, ApplicationSink, ApplicationSnapshot, Disclosure, FieldId, FormSchemaRegistry,
    IntakeFormEngine, IntakeService, IntakeSession, SessionId, Step, SubmissionReceipt, Toggle,
    PACKAGE_FIELD,
};
use crate::workflows::persistence::RepositoryError;

pub(super) fn engine() -> IntakeFormEngine {
    IntakeFormEngine::new(Arc::new(FormSchemaRegistry::default()))
}

pub(super) fn field(id: &str) -> FieldId {
    FieldId::new(id)
}

pub(super) fn answer_personal(engine: &IntakeFormEngine, session: &mut IntakeSession) {
    for (id, value) in [
        ("firstName", "Ana"),
        ("lastName", "Garcia"),
        ("email", "ana@example.com"),
        ("city", "Córdoba"),
    ] {
        engine
            .set_answer(session, &field(id), Answer::text(value))
            .expect("text answer accepted");
    }
    engine
        .set_answer(
            session,
            &field("phone"),
            Answer::phone("351 555 0101").expect("valid phone"),
        )
        .expect("phone accepted");
    engine
        .set_answer(
            session,
            &field("birthDate"),
            Answer::Date(NaiveDate::from_ymd_opt(1990, 5, 1).expect("valid date")),
        )
        .expect("date accepted");
}

pub(super) fn answer_medical(engine: &IntakeFormEngine, session: &mut IntakeSession) {
    for disclosure in Disclosure::ordered() {
        engine
            .set_toggle(session, disclosure, Toggle::No)
            .expect("toggle accepted");
    }
    engine
        .set_answer(session, &field("emergencyName"), Answer::text("Luis Garcia"))
        .expect("contact accepted");
    engine
        .set_answer(
            session,
            &field("emergencyPhone"),
            Answer::phone("+598 99 123 456").expect("valid phone"),
        )
        .expect("contact phone accepted");
    engine
        .set_answer(session, &field("intention"), Answer::text("Conocerme mejor"))
        .expect("intention accepted");
}

/// Walks a fresh session to the payment step with a package chosen.
pub(super) fn session_at_payment(engine: &IntakeFormEngine) -> IntakeSession {
    let mut session = engine.start();
    engine.advance(&mut session).expect("intro advances");
    answer_personal(engine, &mut session);
    engine.advance(&mut session).expect("personal advances");
    answer_medical(engine, &mut session);
    engine.advance(&mut session).expect("medical advances");
    engine
        .set_answer(&mut session, &field(PACKAGE_FIELD), Answer::choice("AVANZADO"))
        .expect("package accepted");
    assert_eq!(session.step(), Step::Payment);
    session
}

/// Same walk as [`session_at_payment`], driven through the service.
pub(super) fn walk_to_payment<S>(service: &IntakeService<S>, id: SessionId)
where
    S: ApplicationSink + 'static,
{
    service.advance(id).expect("intro advances");
    for (name, answer) in [
        ("firstName", Answer::text("Ana")),
        ("lastName", Answer::text("Garcia")),
        ("email", Answer::text("ana@example.com")),
        ("phone", Answer::phone("351 555 0101").expect("phone")),
        (
            "birthDate",
            Answer::Date(NaiveDate::from_ymd_opt(1990, 5, 1).expect("valid date")),
        ),
        ("city", Answer::text("Córdoba")),
    ] {
        service
            .set_answer(id, &field(name), answer)
            .expect("answer accepted");
    }
    service.advance(id).expect("personal advances");
    for disclosure in Disclosure::ordered() {
        service
            .set_toggle(id, disclosure, Toggle::No)
            .expect("toggle accepted");
    }
    for (name, answer) in [
        ("emergencyName", Answer::text("Luis Garcia")),
        ("emergencyPhone", Answer::phone("351 555 0202").expect("phone")),
        ("intention", Answer::text("Conocerme mejor")),
    ] {
        service
            .set_answer(id, &field(name), answer)
            .expect("answer accepted");
    }
    service.advance(id).expect("medical advances");
    service
        .set_answer(id, &field(PACKAGE_FIELD), Answer::choice("AVANZADO"))
        .expect("package accepted");
}

pub(super) fn receipt() -> SubmissionReceipt {
    SubmissionReceipt {
        registration_id: RegistrationId::new(),
        submitted_at: Utc::now(),
    }
}

#[derive(Default)]
pub(super) struct RecordingSink {
    snapshots: Mutex<Vec<ApplicationSnapshot>>,
}

impl RecordingSink {
    pub(super) fn snapshots(&self) -> Vec<ApplicationSnapshot> {
        self.snapshots.lock().expect("sink mutex poisoned").clone()
    }
}

impl ApplicationSink for RecordingSink {
    type Error = RepositoryError;

    fn persist(&self, snapshot: ApplicationSnapshot) -> Result<SubmissionReceipt, Self::Error> {
        self.snapshots
            .lock()
            .expect("sink mutex poisoned")
            .push(snapshot);
        Ok(receipt())
    }
}

pub(super) struct UnavailableSink;

impl ApplicationSink for UnavailableSink {
    type Error = RepositoryError;

    fn persist(&self, _snapshot: ApplicationSnapshot) -> Result<SubmissionReceipt, Self::Error> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Sink that parks inside `persist` until the test releases it.
pub(super) struct GatedSink {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
    calls: AtomicUsize,
}

impl GatedSink {
    pub(super) fn new() -> (Self, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sink = Self {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
            calls: AtomicUsize::new(0),
        };
        (sink, entered_rx, release_tx)
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ApplicationSink for GatedSink {
    type Error = RepositoryError;

    fn persist(&self, _snapshot: ApplicationSnapshot) -> Result<SubmissionReceipt, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered
            .lock()
            .expect("gate mutex poisoned")
            .send(())
            .expect("test is listening");
        self.release
            .lock()
            .expect("gate mutex poisoned")
            .recv()
            .expect("test releases the gate");
        Ok(receipt())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
