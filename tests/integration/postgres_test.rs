//! Scenarios that need real row locks. Skipped unless
//! `LICENSEHUB_TEST_DATABASE_URL` points at a disposable PostgreSQL database.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use licensehub::LicenseHub;
use licensehub::auth::{Principal, RegisterIdentity};
use licensehub::core::config::{AppConfig, AuthConfig, DatabaseConfig};
use licensehub::core::traits::{OsRandom, SystemClock};
use licensehub::database::migration::run_migrations;
use licensehub::database::{DatabasePool, PgStore, Store};
use licensehub::service::CreateLicenseRequest;

use crate::helpers::PASSWORD;

const DATABASE_URL_VAR: &str = "LICENSEHUB_TEST_DATABASE_URL";

async fn pg_hub() -> Option<LicenseHub> {
    let url = std::env::var(DATABASE_URL_VAR).ok()?;
    let config = AppConfig {
        database: DatabaseConfig {
            url,
            ..DatabaseConfig::default()
        },
        auth: AuthConfig {
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            ..AuthConfig::default()
        },
        ..AppConfig::default()
    };
    let pool = DatabasePool::connect(&config.database)
        .await
        .expect("Failed to connect to test database");
    run_migrations(pool.pool())
        .await
        .expect("Failed to migrate test database");
    let store: Arc<dyn Store> = Arc::new(PgStore::from(pool));
    Some(
        LicenseHub::new(store, Arc::new(SystemClock), Arc::new(OsRandom), config)
            .expect("Failed to build hub"),
    )
}

async fn signed_in(hub: &LicenseHub) -> Principal {
    let username = format!("pg_{}", Uuid::new_v4().simple());
    hub.sessions
        .register(RegisterIdentity {
            username: username.clone(),
            email: format!("{username}@example.com"),
            full_name: "Postgres Test".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .expect("Failed to register user");
    let token = hub
        .sessions
        .login(&username, PASSWORD)
        .await
        .expect("Login failed")
        .token;
    hub.authenticate(Some(&token))
        .await
        .expect("Fresh session rejected")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_deactivations_release_one_slot() {
    let Some(hub) = pg_hub().await else {
        eprintln!("{DATABASE_URL_VAR} not set; skipping");
        return;
    };
    let owner = signed_in(&hub).await;
    let application = hub
        .applications
        .register(&owner, "Modeler", "4.2")
        .await
        .unwrap();
    let issued = hub
        .licenses
        .create(
            &owner,
            CreateLicenseRequest {
                application_id: application.id,
                max_activations: Some(2),
                ..CreateLicenseRequest::default()
            },
        )
        .await
        .unwrap();
    let license_id = issued.license.id;
    assert!(hub.validate_license(&issued.key, "machine-a", None).await.unwrap().valid);
    assert!(hub.validate_license(&issued.key, "machine-b", None).await.unwrap().valid);
    let target = hub
        .activations
        .list_for_license(&owner, license_id)
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.machine_fingerprint == "machine-a")
        .unwrap()
        .id;

    // Park both deactivations behind the license row lock.
    let mut holder = hub.store.begin().await.unwrap();
    holder.lock_license(license_id).await.unwrap().unwrap();
    let racers: Vec<_> = (0..2)
        .map(|_| {
            let hub = hub.clone();
            let owner = owner.clone();
            tokio::spawn(async move { hub.deactivate(&owner, target).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(300)).await;
    drop(holder);

    let mut released = 0;
    for racer in futures::future::join_all(racers).await {
        if racer.unwrap().unwrap() {
            released += 1;
        }
    }
    assert_eq!(released, 1);

    let license = hub.licenses.get(&owner, license_id).await.unwrap();
    let rows = hub
        .activations
        .list_for_license(&owner, license_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(license.activation_count as usize, rows.len());

    hub.licenses.delete(&owner, license_id).await.unwrap();
}
