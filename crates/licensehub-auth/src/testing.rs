//! Shared fixtures for unit tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use licensehub_core::config::AuthConfig;
use licensehub_core::traits::{ManualClock, OsRandom};
use licensehub_database::store::{MemoryStore, Store};

use crate::api_token::ApiTokenManager;
use crate::authenticator::{Principal, TokenAuthenticator};
use crate::password::PasswordHasher;
use crate::rbac::ScopeCatalog;
use crate::session::{RegisterIdentity, SessionManager};

pub(crate) const PASSWORD: &str = "correct-horse-battery";

pub(crate) struct AuthHarness {
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
    pub sessions: SessionManager,
    pub tokens: ApiTokenManager,
    pub authenticator: TokenAuthenticator,
}

impl AuthHarness {
    pub fn new() -> Self {
        let config = AuthConfig {
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            ..AuthConfig::default()
        };
        let store = MemoryStore::new();
        let shared: Arc<dyn Store> = Arc::new(store.clone());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let catalog = Arc::new(ScopeCatalog::new());
        let hasher = Arc::new(PasswordHasher::new(&config).unwrap());
        let sessions = SessionManager::new(
            shared.clone(),
            hasher,
            clock.clone(),
            Arc::new(OsRandom),
            config.clone(),
        );
        let tokens = ApiTokenManager::new(
            shared.clone(),
            catalog.clone(),
            clock.clone(),
            Arc::new(OsRandom),
            config.clone(),
        );
        let authenticator =
            TokenAuthenticator::new(shared, catalog, clock.clone(), config.dummy_verify_rounds);
        Self {
            store,
            clock,
            sessions,
            tokens,
            authenticator,
        }
    }

    /// Register `username` and return a live session token.
    pub async fn login_new(&self, username: &str) -> String {
        self.sessions
            .register(RegisterIdentity {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                full_name: username.to_string(),
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap();
        self.sessions.login(username, PASSWORD).await.unwrap().token
    }

    pub async fn principal(&self, token: &str) -> Principal {
        self.authenticator.authenticate(Some(token)).await.unwrap()
    }
}
