//! Local checks on sign-up input, run before any provider call.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::config::AuthConfig;
use crate::core::errors::{TradenomixResult, ValidationError};

/// Passwords shorter than this score zero regardless of content.
pub const MIN_SCORED_PASSWORD_LEN: usize = 6;

const STRENGTH_LABELS: [&str; 5] = ["Weak", "Fair", "Good", "Strong", "Very Strong"];

/// Password strength estimate shown next to the password field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    /// Score from 0 to 5.
    pub score: u8,
    /// Human-readable label.
    pub label: &'static str,
}

/// Score a password: one point each for lowercase, uppercase, digit, symbol and
/// a length of 12 or more.
#[must_use]
pub fn password_strength(password: &str) -> PasswordStrength {
    if password.chars().count() < MIN_SCORED_PASSWORD_LEN {
        return PasswordStrength {
            score: 0,
            label: "Too short",
        };
    }

    let checks = [
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
        password.chars().count() >= 12,
    ];
    let score = checks.iter().map(|&hit| u8::from(hit)).sum::<u8>();
    let label = STRENGTH_LABELS[usize::from(score).min(STRENGTH_LABELS.len() - 1)];

    PasswordStrength { score, label }
}

/// Whether a password scores 3 or more.
#[must_use]
pub fn is_strong_password(password: &str) -> bool {
    password_strength(password).score >= 3
}

/// Sign-up form as submitted by the client.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    /// Requested username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
    /// Password confirmation.
    pub confirm_password: String,
}

/// Validator for credentials entered in the auth forms.
#[derive(Clone, Debug)]
pub struct CredentialValidator {
    email: Regex,
    min_password_len: usize,
}

impl CredentialValidator {
    /// Build a validator from auth settings.
    ///
    /// # Errors
    /// Returns an error if the email pattern fails to compile.
    pub fn new(config: &AuthConfig) -> TradenomixResult<Self> {
        Ok(Self {
            email: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")?,
            min_password_len: config.min_password_len,
        })
    }

    /// Whether `email` looks like `local@domain.tld`.
    #[must_use]
    pub fn is_valid_email(&self, email: &str) -> bool {
        self.email.is_match(email)
    }

    /// Check a sign-up form. The first failing rule wins, in form order.
    ///
    /// # Errors
    /// Returns the first `ValidationError` encountered.
    pub fn validate_signup(&self, form: &SignupForm) -> Result<(), ValidationError> {
        if form.username.trim().is_empty() {
            return Err(ValidationError::UsernameRequired);
        }
        if !self.is_valid_email(form.email.trim()) {
            return Err(ValidationError::InvalidEmail);
        }
        if form.password.chars().count() < self.min_password_len {
            return Err(ValidationError::PasswordTooShort {
                min: self.min_password_len,
            });
        }
        if form.password != form.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> CredentialValidator {
        CredentialValidator::new(&AuthConfig::default()).unwrap()
    }

    fn form(username: &str, email: &str, password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_email_pattern() {
        let v = validator();
        assert!(v.is_valid_email("trader@desk.io"));
        assert!(!v.is_valid_email("trader@desk"));
        assert!(!v.is_valid_email("tra der@desk.io"));
        assert!(!v.is_valid_email("@desk.io"));
    }

    #[test]
    fn test_password_strength_levels() {
        assert_eq!(password_strength("abc").label, "Too short");
        assert_eq!(password_strength("abcdef").score, 1);
        assert_eq!(password_strength("abcdef").label, "Fair");
        assert_eq!(password_strength("Abcdef").label, "Good");
        assert_eq!(password_strength("Abcdef1").label, "Strong");
        assert_eq!(password_strength("Abcdef1!").label, "Very Strong");
        let max = password_strength("Abcdef1!xyz2");
        assert_eq!(max.score, 5);
        assert_eq!(max.label, "Very Strong");
        assert!(is_strong_password("Abcdef1"));
        assert!(!is_strong_password("abcdef1"));
    }

    #[test]
    fn test_password_length_counts_characters_not_bytes() {
        // Six emoji: 24 bytes, 12 UTF-16 units, six chars.
        let emoji = "📈📉💹📊💰🚀";
        assert_eq!(password_strength(emoji).score, 1);
        assert_eq!(password_strength(&emoji[..16]).label, "Too short");

        let v = validator();
        assert_eq!(
            v.validate_signup(&form("trader1", "t@x.io", "éééééé1", "éééééé1")),
            Err(ValidationError::PasswordTooShort { min: 8 })
        );
    }

    #[test]
    fn test_signup_rules_in_order() {
        let v = validator();
        assert_eq!(
            v.validate_signup(&form(" ", "bad", "x", "y")),
            Err(ValidationError::UsernameRequired)
        );
        assert_eq!(
            v.validate_signup(&form("trader1", "bad", "x", "y")),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            v.validate_signup(&form("trader1", "t@x.io", "short", "short")),
            Err(ValidationError::PasswordTooShort { min: 8 })
        );
        assert_eq!(
            v.validate_signup(&form("trader1", "t@x.io", "longenough", "different")),
            Err(ValidationError::PasswordMismatch)
        );
        assert!(
            v.validate_signup(&form("trader1", "t@x.io", "longenough", "longenough"))
                .is_ok()
        );
    }
}
