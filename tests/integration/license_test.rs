//! Integration tests for online validation and activation accounting.

use chrono::Duration;

use licensehub::core::error::ErrorKind;
use licensehub::core::traits::Clock;
use licensehub::entity::license::{LicenseStatus, UpdateLicense};

use crate::helpers::TestApp;

#[tokio::test]
async fn test_ceiling_of_one_admits_one_machine() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("vendor").await;
    let application = app.create_application(&owner).await;
    let (_, key) = app.create_license(&owner, &application, 1).await;

    let first = app
        .hub
        .validate_license(&key, "machine-a", Some("10.0.0.1"))
        .await
        .unwrap();
    assert!(first.valid);
    assert_eq!(first.remaining_slots, Some(0));

    let second = app
        .hub
        .validate_license(&key, "machine-b", None)
        .await
        .unwrap();
    assert!(!second.valid);
    assert_eq!(second.remaining_slots, Some(0));

    let again = app
        .hub
        .validate_license(&key, "machine-a", None)
        .await
        .unwrap();
    assert!(again.valid);
}

#[tokio::test]
async fn test_deactivation_frees_the_slot() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("vendor").await;
    let application = app.create_application(&owner).await;
    let (license, key) = app.create_license(&owner, &application, 1).await;

    assert!(app.hub.validate_license(&key, "machine-a", None).await.unwrap().valid);
    let activations = app
        .hub
        .activations
        .list_for_license(&owner, license.id)
        .await
        .unwrap();
    assert_eq!(activations.len(), 1);

    let (_, stranger) = app.signed_in("stranger").await;
    assert!(
        !app.hub
            .deactivate(&stranger, activations[0].id)
            .await
            .unwrap()
    );
    assert!(
        app.hub
            .deactivate(&owner, activations[0].id)
            .await
            .unwrap()
    );

    let moved = app
        .hub
        .validate_license(&key, "machine-b", None)
        .await
        .unwrap();
    assert!(moved.valid);
}

#[tokio::test]
async fn test_expiry_is_applied_lazily_and_persisted() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("vendor").await;
    let application = app.create_application(&owner).await;
    let (license, key) = app.create_license(&owner, &application, 2).await;
    app.hub
        .licenses
        .update(
            &owner,
            license.id,
            UpdateLicense {
                expires_at: Some(Some(app.clock.now() + Duration::days(7))),
                ..UpdateLicense::default()
            },
        )
        .await
        .unwrap();

    app.clock.advance(Duration::days(8));
    let result = app
        .hub
        .validate_license(&key, "machine-a", None)
        .await
        .unwrap();
    assert!(!result.valid);
    assert_eq!(result.message, "License has expired");

    let stored = app.hub.licenses.get(&owner, license.id).await.unwrap();
    assert_eq!(stored.status, LicenseStatus::Expired);
}

#[tokio::test]
async fn test_blocked_license_is_refused_until_unblocked() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("vendor").await;
    let application = app.create_application(&owner).await;
    let (license, key) = app.create_license(&owner, &application, 1).await;

    app.hub.licenses.block(&owner, license.id).await.unwrap();
    let refused = app
        .hub
        .validate_license(&key, "machine-a", None)
        .await
        .unwrap();
    assert!(!refused.valid);
    assert_eq!(refused.status, Some(LicenseStatus::Blocked));

    app.hub.licenses.unblock(&owner, license.id).await.unwrap();
    assert!(app.hub.validate_license(&key, "machine-a", None).await.unwrap().valid);
}

#[tokio::test]
async fn test_licenses_of_another_owner_are_invisible() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("vendor").await;
    let application = app.create_application(&owner).await;
    let (license, _) = app.create_license(&owner, &application, 1).await;

    let (_, stranger) = app.signed_in("stranger").await;
    let err = app.hub.licenses.get(&stranger, license.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    let err = app
        .hub
        .licenses
        .revoke(&stranger, license.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_claims_for_the_last_slot() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("vendor").await;
    let application = app.create_application(&owner).await;
    let (_, key) = app.create_license(&owner, &application, 1).await;

    let attempts = (0..8).map(|i| {
        let hub = app.hub.clone();
        let key = key.clone();
        tokio::spawn(async move {
            hub.validate_license(&key, &format!("machine-{i}"), None)
                .await
                .unwrap()
        })
    });
    let results = futures::future::join_all(attempts).await;
    let granted = results
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|r| r.valid)
        .count();
    assert_eq!(granted, 1);
}
