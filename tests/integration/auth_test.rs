//! Integration tests for credential verification and scoped tokens.

use chrono::Duration;

use licensehub::auth::Requirement;
use licensehub::core::error::ErrorKind;
use licensehub::core::traits::Clock;
use licensehub::database::Store;
use licensehub::entity::scope::{Scope, ScopeSet};
use licensehub::service::CreateLicenseRequest;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_login_then_authenticate() {
    let app = TestApp::new();
    let (_, principal) = app.signed_in("alice").await;

    assert_eq!(principal.identity.username, "alice");
    assert!(principal.scopes.contains(Scope::LicenseWrite));
    assert!(!principal.scopes.contains(Scope::UserManagement));
}

#[tokio::test]
async fn test_expired_session_fails_opaquely() {
    let app = TestApp::new();
    let (token, _) = app.signed_in("alice").await;

    app.clock.advance(Duration::minutes(31));
    let expired = app.hub.authenticate(Some(&token)).await.unwrap_err();
    let unknown = app
        .hub
        .authenticate(Some("st_not-a-real-token"))
        .await
        .unwrap_err();
    let missing = app.hub.authenticate(None).await.unwrap_err();

    for err in [&expired, &unknown, &missing] {
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, "Invalid token");
    }
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let app = TestApp::new();
    let (token, principal) = app.signed_in("alice").await;

    app.hub.sessions.logout(&principal).await.unwrap();
    let err = app.hub.authenticate(Some(&token)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);
}

#[tokio::test]
async fn test_read_only_token_cannot_write() {
    let app = TestApp::new();
    let (_, owner) = app.signed_in("alice").await;
    let application = app.create_application(&owner).await;
    let (license, _) = app.create_license(&owner, &application, 1).await;

    let issued = app
        .hub
        .api_tokens
        .issue(
            &owner,
            "reporting",
            [Scope::LicenseRead].into_iter().collect::<ScopeSet>(),
            None,
        )
        .await
        .unwrap();
    assert!(issued.token.starts_with("lt_"));

    let reader = app.hub.authenticate(Some(&issued.token)).await.unwrap();
    assert!(app.hub.authorize(&reader.scopes, &Scope::LicenseRead.into()));
    assert!(!app.hub.authorize(&reader.scopes, &Scope::LicenseWrite.into()));

    let fetched = app.hub.licenses.get(&reader, license.id).await.unwrap();
    assert_eq!(fetched.id, license.id);

    let err = app
        .hub
        .licenses
        .create(
            &reader,
            CreateLicenseRequest {
                application_id: application.id,
                ..CreateLicenseRequest::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn test_requirement_combinators_fail_closed() {
    let app = TestApp::new();
    let (_, principal) = app.signed_in("alice").await;

    assert!(!app.hub.authorize(&principal.scopes, &Requirement::Any(vec![])));
    assert!(!app.hub.authorize(&principal.scopes, &Requirement::All(vec![])));
    assert!(app.hub.authorize(
        &principal.scopes,
        &Requirement::All(vec![Scope::LicenseRead, Scope::Validation]),
    ));
    assert!(!app.hub.authorize(
        &principal.scopes,
        &Requirement::All(vec![Scope::LicenseRead, Scope::UserManagement]),
    ));
}

#[tokio::test]
async fn test_deactivated_identity_loses_access() {
    let app = TestApp::new();
    let (token, principal) = app.signed_in("alice").await;

    let mut uow = app.store.begin().await.unwrap();
    uow.set_identity_active(principal.identity.id, false, app.clock.now())
        .await
        .unwrap();
    uow.commit().await.unwrap();

    let err = app.hub.authenticate(Some(&token)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);
}

#[tokio::test]
async fn test_storage_outage_is_retryable() {
    let app = TestApp::new();
    let (token, _) = app.signed_in("alice").await;

    app.store.set_unavailable(true);
    let err = app.hub.authenticate(Some(&token)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Storage);
    assert!(err.is_retryable());

    app.store.set_unavailable(false);
    assert!(app.hub.authenticate(Some(&token)).await.is_ok());
}
