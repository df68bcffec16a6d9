//! License key format, normalization and hashing.

use sha2::{Digest, Sha256};

use licensehub_core::config::LicenseConfig;
use licensehub_core::traits::RandomSource;
use licensehub_core::traits::random::ALPHANUMERIC_UPPER;

/// Shape of a license key: `length` upper-case alphanumerics in groups of
/// `group_size`, joined by single dashes (`ABCDE-FGHIJ-...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicenseKeyFormat {
    length: usize,
    group_size: usize,
}

impl LicenseKeyFormat {
    /// Creates a format. `length` must be a positive multiple of `group_size`.
    pub fn new(length: usize, group_size: usize) -> Self {
        Self { length, group_size }
    }

    /// Creates the configured format.
    pub fn from_config(config: &LicenseConfig) -> Self {
        Self::new(config.key_length, config.key_group_size)
    }

    /// Strip whitespace and upper-case.
    pub fn normalize(&self, raw: &str) -> String {
        raw.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect()
    }

    /// Whether an already normalized key has the expected shape.
    pub fn is_valid(&self, normalized: &str) -> bool {
        if self.group_size == 0 {
            return false;
        }
        let mut total = 0;
        for group in normalized.split('-') {
            if group.len() != self.group_size
                || !group
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            {
                return false;
            }
            total += group.len();
        }
        total == self.length
    }

    /// Normalize `raw` and return it if well-formed.
    pub fn parse(&self, raw: &str) -> Option<String> {
        let normalized = self.normalize(raw);
        self.is_valid(&normalized).then_some(normalized)
    }

    /// SHA-256 hex digest of a normalized key.
    pub fn hash(&self, normalized: &str) -> String {
        hex::encode(Sha256::digest(normalized.as_bytes()))
    }

    /// Generate a fresh well-formed key.
    pub fn generate(&self, random: &dyn RandomSource) -> String {
        let chars = random.string_from(ALPHANUMERIC_UPPER, self.length);
        chars
            .as_bytes()
            .chunks(self.group_size.max(1))
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl Default for LicenseKeyFormat {
    fn default() -> Self {
        Self::from_config(&LicenseConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use licensehub_core::traits::OsRandom;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_and_validate() {
        let format = LicenseKeyFormat::default();
        assert_eq!(
            format.parse(" abcde-12345-fghij-67890-klmno "),
            Some("ABCDE-12345-FGHIJ-67890-KLMNO".to_string())
        );
        assert_eq!(format.parse("ABCDE-12345-FGHIJ-67890"), None);
        assert_eq!(format.parse("ABCDE12345FGHIJ67890KLMNO"), None);
        assert_eq!(format.parse("ABCDE--12345-FGHIJ-67890-KLMNO"), None);
        assert_eq!(format.parse("ABCDE-12345-FGHIJ-67890-KLMN!"), None);
        assert_eq!(format.parse(""), None);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let format = LicenseKeyFormat::default();
        let key = "ABCDE-12345-FGHIJ-67890-KLMNO";
        assert_eq!(format.hash(key), format.hash(key));
        assert_eq!(format.hash(key).len(), 64);
        assert_ne!(format.hash(key), format.hash("ABCDE-12345-FGHIJ-67890-KLMNP"));
    }

    #[test]
    fn test_generated_keys_are_well_formed() {
        let format = LicenseKeyFormat::default();
        let key = format.generate(&OsRandom);
        assert_eq!(key.len(), 29);
        assert!(format.is_valid(&key));
    }

    proptest! {
        #[test]
        fn prop_generated_keys_parse_to_themselves(groups in 1usize..8, size in 1usize..8) {
            let format = LicenseKeyFormat::new(groups * size, size);
            let key = format.generate(&OsRandom);
            prop_assert_eq!(format.parse(&key), Some(key.clone()));
        }

        #[test]
        fn prop_case_and_spacing_do_not_change_the_hash(key in "[A-Z0-9]{5}(-[A-Z0-9]{5}){4}") {
            let format = LicenseKeyFormat::default();
            let messy = format!("  {} ", key.to_lowercase().replace('-', " - "));
            let parsed = format.parse(&messy);
            prop_assert_eq!(parsed.as_deref(), Some(key.as_str()));
            prop_assert_eq!(format.hash(&format.normalize(&messy)), format.hash(&key));
        }

        #[test]
        fn prop_normalize_is_idempotent(raw in "[ -~]{0,40}") {
            let format = LicenseKeyFormat::default();
            let once = format.normalize(&raw);
            prop_assert_eq!(format.normalize(&once), once);
        }
    }
}
