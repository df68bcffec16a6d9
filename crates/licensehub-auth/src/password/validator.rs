//! Password policy enforcement for new passwords.

use licensehub_core::config::AuthConfig;
use licensehub_core::error::AppError;

/// Validates new passwords against the configured policy.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    min_length: usize,
}

impl PasswordValidator {
    /// Creates a new validator from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            min_length: config.password_min_length,
        }
    }

    /// Validates a password against the policy.
    pub fn validate(&self, password: &str) -> Result<(), AppError> {
        if password.chars().count() < self.min_length {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }
        if password.trim().is_empty() {
            return Err(AppError::validation("Password must not be blank"));
        }
        Ok(())
    }

    /// Validates that a new password differs from the old one.
    pub fn validate_not_same(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        if old_password == new_password {
            return Err(AppError::validation(
                "New password must be different from the current password",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_length() {
        let validator = PasswordValidator::new(&AuthConfig::default());
        assert!(validator.validate("short").is_err());
        assert!(validator.validate("long enough").is_ok());
        assert!(validator.validate("          ").is_err());
    }

    #[test]
    fn test_not_same() {
        let validator = PasswordValidator::new(&AuthConfig::default());
        assert!(validator.validate_not_same("a-password", "a-password").is_err());
        assert!(validator.validate_not_same("a-password", "b-password").is_ok());
    }
}
