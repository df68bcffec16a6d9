//! Integration tests for the offline activation exchange.

use chrono::Duration;

use licensehub::core::error::ErrorKind;
use licensehub::entity::offline::RequestStatus;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_full_offline_round_trip() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("vendor").await;
    let application = app.create_application(&owner).await;
    let (license, key) = app.create_license(&owner, &application, 2).await;

    let ticket = app
        .hub
        .create_offline_request(&key, "air-gapped-01", Some("Lab 3"))
        .await
        .unwrap();
    let codes = app
        .hub
        .generate_offline_codes(&owner, license.id, Some("air-gapped-01"), 3)
        .await
        .unwrap();
    assert_eq!(codes.len(), 3);

    let completed = app
        .hub
        .complete_offline_request(&ticket.request_code, &codes[0].code)
        .await
        .unwrap();
    assert_eq!(completed.status, RequestStatus::Completed);
    assert_eq!(completed.remaining_slots, 1);

    let activations = app
        .hub
        .activations
        .list_for_license(&owner, license.id)
        .await
        .unwrap();
    assert_eq!(activations.len(), 1);
    assert_eq!(activations[0].machine_fingerprint, "air-gapped-01");
    assert_eq!(activations[0].machine_name.as_deref(), Some("Lab 3"));

    // The offline machine later comes online and only heartbeats.
    let online = app
        .hub
        .validate_license(&key, "air-gapped-01", None)
        .await
        .unwrap();
    assert!(online.valid);
    assert_eq!(online.remaining_slots, Some(1));
}

#[tokio::test]
async fn test_request_refused_when_license_is_full() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("vendor").await;
    let application = app.create_application(&owner).await;
    let (_, key) = app.create_license(&owner, &application, 1).await;

    assert!(app.hub.validate_license(&key, "online-01", None).await.unwrap().valid);
    let err = app
        .hub
        .create_offline_request(&key, "offline-01", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::LimitReached);
}

#[tokio::test]
async fn test_code_is_single_use_across_requests() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("vendor").await;
    let application = app.create_application(&owner).await;
    let (license, key) = app.create_license(&owner, &application, 5).await;

    let first = app
        .hub
        .create_offline_request(&key, "offline-01", None)
        .await
        .unwrap();
    let second = app
        .hub
        .create_offline_request(&key, "offline-02", None)
        .await
        .unwrap();
    let code = app
        .hub
        .generate_offline_codes(&owner, license.id, None, 1)
        .await
        .unwrap()
        .remove(0)
        .code;

    app.hub
        .complete_offline_request(&first.request_code, &code)
        .await
        .unwrap();
    let err = app
        .hub
        .complete_offline_request(&second.request_code, &code)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AlreadyUsed);

    let err = app
        .hub
        .complete_offline_request(&first.request_code, &code)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AlreadyCompleted);
}

#[tokio::test]
async fn test_expired_request_cannot_be_completed() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("vendor").await;
    let application = app.create_application(&owner).await;
    let (license, key) = app.create_license(&owner, &application, 1).await;

    let ticket = app
        .hub
        .create_offline_request(&key, "offline-01", None)
        .await
        .unwrap();
    let code = app
        .hub
        .generate_offline_codes(&owner, license.id, None, 1)
        .await
        .unwrap()
        .remove(0)
        .code;

    app.clock.advance(Duration::hours(24) + Duration::seconds(1));
    let err = app
        .hub
        .complete_offline_request(&ticket.request_code, &code)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Expired);

    let form = app.hub.offline.get_request(&ticket.request_code).await.unwrap();
    assert_eq!(form.status, RequestStatus::Expired);
    assert!(form.completed_at.is_none());
}

#[tokio::test]
async fn test_codes_only_for_owned_licenses() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("vendor").await;
    let application = app.create_application(&owner).await;
    let (license, _) = app.create_license(&owner, &application, 1).await;

    let (_, stranger) = app.signed_in("stranger").await;
    let err = app
        .hub
        .generate_offline_codes(&stranger, license.id, None, 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}
