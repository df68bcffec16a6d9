//! Shared test helpers for integration tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use licensehub::LicenseHub;
use licensehub::auth::{Principal, RegisterIdentity};
use licensehub::core::config::{AppConfig, AuthConfig};
use licensehub::core::traits::{ManualClock, OsRandom};
use licensehub::database::MemoryStore;
use licensehub::entity::application::Application;
use licensehub::entity::identity::Identity;
use licensehub::entity::license::License;
use licensehub::service::CreateLicenseRequest;

pub const PASSWORD: &str = "integration-password";

/// Test application context
pub struct TestApp {
    /// The hub under test
    pub hub: LicenseHub,
    /// Direct handle on the backing store
    pub store: MemoryStore,
    /// Time source shared by every service
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    /// Create a new test application over an empty in-memory store
    pub fn new() -> Self {
        let config = AppConfig {
            auth: AuthConfig {
                argon2_memory_kib: 1024,
                argon2_iterations: 1,
                ..AuthConfig::default()
            },
            ..AppConfig::default()
        };
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap(),
        ));
        let hub = LicenseHub::new(
            Arc::new(store.clone()),
            clock.clone(),
            Arc::new(OsRandom),
            config,
        )
        .expect("Failed to build hub");
        Self { hub, store, clock }
    }

    /// Register an identity with the default roles
    pub async fn create_test_user(&self, username: &str) -> Identity {
        self.hub
            .sessions
            .register(RegisterIdentity {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                full_name: format!("Test {username}"),
                password: PASSWORD.to_string(),
            })
            .await
            .expect("Failed to register user")
    }

    /// Log in and return the plaintext session token
    pub async fn login(&self, username: &str) -> String {
        self.hub
            .sessions
            .login(username, PASSWORD)
            .await
            .expect("Login failed")
            .token
    }

    /// Register, log in and authenticate in one step
    pub async fn signed_in(&self, username: &str) -> (String, Principal) {
        self.create_test_user(username).await;
        let token = self.login(username).await;
        let principal = self
            .hub
            .authenticate(Some(&token))
            .await
            .expect("Fresh session rejected");
        (token, principal)
    }

    /// Register an application owned by `principal`
    pub async fn create_application(&self, principal: &Principal) -> Application {
        self.hub
            .applications
            .register(principal, "Modeler", "4.2")
            .await
            .expect("Failed to register application")
    }

    /// Create a license with the given ceiling and return it with its key
    pub async fn create_license(
        &self,
        principal: &Principal,
        application: &Application,
        max_activations: i32,
    ) -> (License, String) {
        let issued = self
            .hub
            .licenses
            .create(
                principal,
                CreateLicenseRequest {
                    application_id: application.id,
                    max_activations: Some(max_activations),
                    ..CreateLicenseRequest::default()
                },
            )
            .await
            .expect("Failed to create license");
        (issued.license, issued.key)
    }
}
