use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use cohort_intake::workflows::admissions::{
    AdmissionsService, Notification, NotificationError, NotificationPublisher, PackageSelection,
    RegistrationStatusKind, APPLICANT_TEMPLATE, STAFF_TEMPLATE,
};
use cohort_intake::workflows::enrollment::{
    CohortPolicy, CohortRegistry, CycleStatus, EnrollmentApi, EnrollmentError, Level,
    StudentFilter,
};
use cohort_intake::workflows::intake::{
    Answer, Disclosure, FieldId, FormSchemaRegistry, IntakeError, IntakeService, SessionId,
    Toggle, PACKAGE_FIELD,
};
use cohort_intake::workflows::InMemoryStore;

#[derive(Default)]
struct MemoryNotifications {
    sent: Mutex<Vec<Notification>>,
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notification mutex")
            .push(notification);
        Ok(())
    }
}

type Admissions = AdmissionsService<InMemoryStore, MemoryNotifications>;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn apply(intake: &IntakeService<Admissions>, first_name: &str, package: &str) -> SessionId {
    let id = intake.start().session_id;
    intake.advance(id).expect("intro advances");

    let email = format!("{}@example.com", first_name.to_lowercase());
    for (field, answer) in [
        ("firstName", Answer::text(first_name)),
        ("lastName", Answer::text("Pereyra")),
        ("email", Answer::text(&email)),
        ("phone", Answer::phone("+54 351 555 0101").expect("valid phone")),
        ("birthDate", Answer::Date(date(1988, 3, 14))),
        ("city", Answer::text("Rosario")),
    ] {
        intake
            .set_answer(id, &FieldId::new(field), answer)
            .expect("personal answer accepted");
    }
    intake.advance(id).expect("personal step advances");

    for disclosure in Disclosure::ordered() {
        intake
            .set_toggle(id, disclosure, Toggle::No)
            .expect("toggle accepted");
    }
    for (field, answer) in [
        ("emergencyName", Answer::text("Marta Pereyra")),
        ("emergencyPhone", Answer::phone("351 555 0199").expect("valid phone")),
        ("intention", Answer::text("Liderar mejor a mi equipo")),
    ] {
        intake
            .set_answer(id, &FieldId::new(field), answer)
            .expect("medical answer accepted");
    }
    intake.advance(id).expect("medical step advances");

    intake
        .set_answer(id, &FieldId::new(PACKAGE_FIELD), Answer::choice(package))
        .expect("package accepted");
    id
}

#[test]
fn applicant_moves_from_intake_to_attendance() {
    let store = Arc::new(InMemoryStore::new());
    let notifications = Arc::new(MemoryNotifications::default());
    let admissions = Arc::new(AdmissionsService::new(
        Arc::clone(&store),
        Arc::clone(&notifications),
    ));
    let intake = IntakeService::new(
        Arc::new(FormSchemaRegistry::default()),
        Arc::clone(&admissions),
    );
    let enrollment = EnrollmentApi::new(
        CohortRegistry::new(Arc::clone(&store), CohortPolicy::default()),
        Arc::clone(&store),
    );

    let session = apply(&intake, "Sofia", "PROGRAMA LIDER");
    let receipt = intake.submit(session, true).expect("submission accepted");
    assert!(matches!(intake.view(session), Err(IntakeError::SessionClosed)));
    assert_eq!(intake.submit(session, true).expect("receipt kept"), receipt);

    let queued = admissions.list(None).expect("queue loads");
    assert_eq!(queued.len(), 1);
    let registration = &queued[0];
    assert_eq!(registration.id, receipt.registration_id);
    assert_eq!(registration.selected_package, PackageSelection::ProgramaLider);
    let view = registration.view();
    assert_eq!(view.full_name, "Sofia Pereyra");
    assert_eq!(view.answers[&FieldId::new("allergies")], "Perfecto estado");
    assert_eq!(view.answers[&FieldId::new("medication")], "No aplica");

    let templates: Vec<String> = notifications
        .sent
        .lock()
        .expect("notification mutex")
        .iter()
        .map(|notification| notification.template.clone())
        .collect();
    assert_eq!(templates, vec![STAFF_TEMPLATE, APPLICANT_TEMPLATE]);

    admissions
        .approve(&receipt.registration_id)
        .expect("staff approves");
    let cycle = enrollment
        .registry
        .create_cycle(Level::ProgramaLider, date(2024, 11, 7), date(2024, 11, 10))
        .expect("cycle opens");
    let enrolled = enrollment
        .converter
        .convert(&receipt.registration_id, &cycle.id)
        .expect("conversion succeeds");

    assert_eq!(enrolled.student.name, "Sofia Pereyra");
    assert_eq!(enrolled.cycle.seats_left(), 19);
    assert_eq!(
        admissions
            .get(&receipt.registration_id)
            .expect("registration kept")
            .status
            .kind(),
        RegistrationStatusKind::Enrolled
    );
    assert!(admissions.list(None).expect("queue loads").is_empty());

    for day in [0, 1] {
        enrollment
            .attendance
            .toggle(&enrolled.student.id, day)
            .expect("attendance recorded");
    }
    let students = enrollment
        .attendance
        .list(&StudentFilter {
            search: Some("sofia".to_string()),
            ..StudentFilter::default()
        })
        .expect("students load");
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].progress(), 50);
}

#[test]
fn completed_cycle_turns_late_payers_away() {
    let store = Arc::new(InMemoryStore::new());
    let admissions = Arc::new(AdmissionsService::new(
        Arc::clone(&store),
        Arc::new(MemoryNotifications::default()),
    ));
    let intake = IntakeService::new(
        Arc::new(FormSchemaRegistry::default()),
        Arc::clone(&admissions),
    );
    let enrollment = EnrollmentApi::new(
        CohortRegistry::new(Arc::clone(&store), CohortPolicy::default()),
        Arc::clone(&store),
    );

    let session = apply(&intake, "Tomas", "INICIAL");
    let receipt = intake.submit(session, true).expect("submission accepted");
    admissions
        .approve(&receipt.registration_id)
        .expect("staff approves");

    let cycle = enrollment
        .registry
        .create_cycle(Level::Inicial, date(2024, 9, 5), date(2024, 9, 8))
        .expect("cycle opens");
    for status in [CycleStatus::InProgress, CycleStatus::Completed] {
        enrollment
            .registry
            .set_status(&cycle.id, status)
            .expect("cycle advances");
    }

    assert!(matches!(
        enrollment.converter.convert(&receipt.registration_id, &cycle.id),
        Err(EnrollmentError::CycleClosed(_))
    ));
    assert_eq!(
        admissions
            .get(&receipt.registration_id)
            .expect("registration kept")
            .status
            .kind(),
        RegistrationStatusKind::PendingPayment
    );
}
