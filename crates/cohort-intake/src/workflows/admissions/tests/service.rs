use std::sync::Arc;

use chrono::Duration;

use super::common::*;
use crate::workflows::admissions::{
    AdmissionAction, AdmissionsError, AdmissionsService, PackageSelection, Registration,
    RegistrationId, RegistrationRepository, RegistrationStatus, RegistrationStatusKind,
    TransitionError, APPLICANT_TEMPLATE, STAFF_TEMPLATE,
};
use crate::workflows::intake::ApplicationSink;
use crate::workflows::RepositoryError;

#[test]
fn submit_stores_pending_review_and_notifies() {
    let (service, store, notifications) = build_service();

    let registration = service
        .submit(snapshot("Ana", "PROGRAMA LIDER"))
        .expect("submission succeeds");

    assert_eq!(registration.status, RegistrationStatus::PendingReview);
    assert_eq!(registration.version, 1);
    assert_eq!(registration.selected_package, PackageSelection::ProgramaLider);
    assert_eq!(
        store.fetch(&registration.id).expect("fetch succeeds"),
        Some(registration.clone())
    );

    let events = notifications.events();
    let templates: Vec<_> = events.iter().map(|event| event.template.as_str()).collect();
    assert_eq!(templates, vec![STAFF_TEMPLATE, APPLICANT_TEMPLATE]);
    assert_eq!(events[0].details["name"], "Ana Garcia");
    assert_eq!(events[1].details["to"], "ana@example.com");
}

#[test]
fn notification_failure_does_not_fail_submission() {
    let store = Arc::new(crate::workflows::InMemoryStore::new());
    let service = AdmissionsService::new(store.clone(), Arc::new(OfflineNotifications));

    let registration = service
        .submit(snapshot("Ana", "INICIAL"))
        .expect("submission still succeeds");

    assert!(store
        .fetch(&registration.id)
        .expect("fetch succeeds")
        .is_some());
}

#[test]
fn unknown_package_defaults_to_inicial() {
    let (service, _, _) = build_service();

    let registration = service
        .submit(snapshot("Ana", "VIP"))
        .expect("submission succeeds");

    assert_eq!(registration.selected_package, PackageSelection::Inicial);
}

#[test]
fn sink_receipt_points_at_the_stored_registration() {
    let (service, store, _) = build_service();

    let receipt = service
        .persist(snapshot("Ana", "AVANZADO"))
        .expect("persist succeeds");

    let stored = store
        .fetch(&receipt.registration_id)
        .expect("fetch succeeds")
        .expect("registration stored");
    assert_eq!(stored.created_at, receipt.submitted_at);
}

#[test]
fn review_flow_moves_through_statuses() {
    let (service, _, _) = build_service();
    let registration = service
        .submit(snapshot("Ana", "INICIAL"))
        .expect("submission succeeds");

    let rejected = service.reject(&registration.id).expect("reject succeeds");
    assert_eq!(rejected.status.kind(), RegistrationStatusKind::Deleted);
    assert_eq!(rejected.version, 2);

    let restored = service.restore(&registration.id).expect("restore succeeds");
    assert_eq!(restored.status, RegistrationStatus::PendingReview);
    assert_eq!(restored.snapshot, registration.snapshot);

    let approved = service.approve(&registration.id).expect("approve succeeds");
    assert_eq!(approved.status, RegistrationStatus::PendingPayment);
    assert_eq!(approved.version, 4);
}

#[test]
fn invalid_transition_leaves_registration_untouched() {
    let (service, store, _) = build_service();
    let registration = service
        .submit(snapshot("Ana", "INICIAL"))
        .expect("submission succeeds");
    service.approve(&registration.id).expect("approve succeeds");

    match service.reject(&registration.id) {
        Err(AdmissionsError::Transition(TransitionError { action, from })) => {
            assert_eq!(action, AdmissionAction::Reject);
            assert_eq!(from, RegistrationStatusKind::PendingPayment);
        }
        other => panic!("expected transition error, got {other:?}"),
    }

    let stored = store
        .fetch(&registration.id)
        .expect("fetch succeeds")
        .expect("registration stored");
    assert_eq!(stored.status, RegistrationStatus::PendingPayment);
    assert_eq!(stored.version, 2);
}

#[test]
fn approve_is_refused_once_review_is_over() {
    let (service, store, _) = build_service();
    let paid = service
        .submit(snapshot("Ana", "INICIAL"))
        .expect("submission succeeds");
    let removed = service
        .submit(snapshot("Beto", "INICIAL"))
        .expect("submission succeeds");
    service.approve(&paid.id).expect("first approve succeeds");
    service.reject(&removed.id).expect("reject succeeds");

    for (id, from) in [
        (paid.id, RegistrationStatusKind::PendingPayment),
        (removed.id, RegistrationStatusKind::Deleted),
    ] {
        match service.approve(&id) {
            Err(AdmissionsError::Transition(TransitionError { action, from: found })) => {
                assert_eq!(action, AdmissionAction::Approve);
                assert_eq!(found, from);
            }
            other => panic!("expected transition error, got {other:?}"),
        }

        let stored = store
            .fetch(&id)
            .expect("fetch succeeds")
            .expect("registration stored");
        assert_eq!(stored.status.kind(), from);
        assert_eq!(stored.version, 2);
    }
}

#[test]
fn stale_write_reports_version_conflict() {
    let repository = Arc::new(StaleRepository::default());
    let service = AdmissionsService::new(repository.clone(), Arc::new(MemoryNotifications::default()));
    let registration = service
        .submit(snapshot("Ana", "INICIAL"))
        .expect("submission succeeds");

    assert!(matches!(
        service.approve(&registration.id),
        Err(AdmissionsError::Repository(RepositoryError::VersionConflict {
            expected: 1,
            found: 2
        }))
    ));
    let stored = repository
        .fetch(&registration.id)
        .expect("fetch succeeds")
        .expect("registration stored");
    assert_eq!(stored.status, RegistrationStatus::PendingReview);
}

#[test]
fn concurrent_staff_edits_lose_the_second_write() {
    let (service, store, _) = build_service();
    let registration = service
        .submit(snapshot("Ana", "INICIAL"))
        .expect("submission succeeds");

    let mut first = registration.clone();
    first.status = RegistrationStatus::PendingPayment;
    store.update(first, 1).expect("first write lands");

    let mut second = registration;
    second.status = second
        .status
        .apply(AdmissionAction::Reject)
        .expect("reject is valid from review");
    assert_eq!(
        store.update(second, 1),
        Err(RepositoryError::VersionConflict {
            expected: 1,
            found: 2
        })
    );
}

#[test]
fn list_defaults_to_open_queue_newest_first() {
    let (service, store, _) = build_service();

    let mut older = Registration::new(snapshot("Beto", "INICIAL"));
    older.created_at -= Duration::days(2);
    let older = store.insert(older).expect("insert succeeds");
    let newer = store
        .insert(Registration::new(snapshot("Carla", "AVANZADO")))
        .expect("insert succeeds");
    let deleted = service
        .submit(snapshot("Dario", "INICIAL"))
        .expect("submission succeeds");
    service.reject(&deleted.id).expect("reject succeeds");
    service.approve(&older.id).expect("approve succeeds");

    let open: Vec<RegistrationId> = service
        .list(None)
        .expect("list succeeds")
        .into_iter()
        .map(|registration| registration.id)
        .collect();
    assert_eq!(open, vec![newer.id, older.id]);

    let removed = service
        .list(Some(RegistrationStatusKind::Deleted))
        .expect("list succeeds");
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id, deleted.id);
}

#[test]
fn get_reports_missing_registrations() {
    let (service, _, _) = build_service();
    let missing = RegistrationId::new();

    assert!(matches!(
        service.get(&missing),
        Err(AdmissionsError::NotFound(id)) if id == missing
    ));
}

#[test]
fn unavailable_store_surfaces_repository_error() {
    let service = AdmissionsService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryNotifications::default()),
    );

    assert!(matches!(
        service.submit(snapshot("Ana", "INICIAL")),
        Err(AdmissionsError::Repository(RepositoryError::Unavailable(_)))
    ));
}
