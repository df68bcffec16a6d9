//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Credential lifetime and password hashing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session credential lifetime in minutes.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: i64,
    /// Default API token lifetime in days when the caller gives no expiry.
    #[serde(default = "default_api_token_ttl")]
    pub api_token_ttl_days: i64,
    /// Argon2 memory cost in KiB.
    #[serde(default = "default_argon2_memory")]
    pub argon2_memory_kib: u32,
    /// Argon2 iteration count.
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,
    /// Argon2 lanes.
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
    /// SHA-256 rounds run on the credential-not-found branch.
    #[serde(default = "default_dummy_rounds")]
    pub dummy_verify_rounds: u32,
    /// Minimum password length.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_minutes: default_session_ttl(),
            api_token_ttl_days: default_api_token_ttl(),
            argon2_memory_kib: default_argon2_memory(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            dummy_verify_rounds: default_dummy_rounds(),
            password_min_length: default_password_min(),
        }
    }
}

fn default_session_ttl() -> i64 {
    30
}

fn default_api_token_ttl() -> i64 {
    365
}

fn default_argon2_memory() -> u32 {
    19_456
}

fn default_argon2_iterations() -> u32 {
    2
}

fn default_argon2_parallelism() -> u32 {
    1
}

fn default_dummy_rounds() -> u32 {
    12
}

fn default_password_min() -> usize {
    8
}
