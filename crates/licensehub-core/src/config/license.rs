//! License key configuration.

use serde::{Deserialize, Serialize};

/// License key shape and defaults for new licenses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseConfig {
    /// Number of alphanumeric characters in a key, dashes excluded.
    #[serde(default = "default_key_length")]
    pub key_length: usize,
    /// Characters per dash-separated block.
    #[serde(default = "default_group_size")]
    pub key_group_size: usize,
    /// Activation ceiling used when a license is created without one.
    #[serde(default = "default_max_activations")]
    pub default_max_activations: i32,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            key_length: default_key_length(),
            key_group_size: default_group_size(),
            default_max_activations: default_max_activations(),
        }
    }
}

fn default_key_length() -> usize {
    25
}

fn default_group_size() -> usize {
    5
}

fn default_max_activations() -> i32 {
    1
}
