//! Offline activation exchange configuration.

use serde::{Deserialize, Serialize};

/// Windows and code shapes for the offline activation handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// How long a pending request form stays redeemable.
    #[serde(default = "default_request_ttl")]
    pub request_ttl_hours: i64,
    /// How long a generated activation code stays redeemable.
    #[serde(default = "default_code_ttl")]
    pub code_ttl_days: i64,
    /// Hex characters kept from the request digest.
    #[serde(default = "default_code_length")]
    pub request_code_length: usize,
    /// Characters in a generated activation code.
    #[serde(default = "default_code_length")]
    pub activation_code_length: usize,
    /// Upper bound on codes generated in one call.
    #[serde(default = "default_max_batch")]
    pub max_codes_per_batch: usize,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            request_ttl_hours: default_request_ttl(),
            code_ttl_days: default_code_ttl(),
            request_code_length: default_code_length(),
            activation_code_length: default_code_length(),
            max_codes_per_batch: default_max_batch(),
        }
    }
}

fn default_request_ttl() -> i64 {
    24
}

fn default_code_ttl() -> i64 {
    30
}

fn default_code_length() -> usize {
    16
}

fn default_max_batch() -> usize {
    100
}
