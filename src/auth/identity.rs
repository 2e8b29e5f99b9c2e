//! Authenticated identities as reported by the identity provider.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::AuthConfig;
use crate::core::ids::IdentityId;

/// Provider name used for email/password identities.
pub const EMAIL_PROVIDER: &str = "email";

/// How an identity reached the application.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPathway {
    /// Email/password sign-in.
    PasswordSignIn,
    /// Email/password sign-up.
    PasswordSignUp,
    /// Return from an OAuth provider redirect.
    OAuth,
    /// Existing session picked up on startup.
    SessionRestore,
    /// Return from an email-verification link.
    EmailVerification,
}

impl AuthPathway {
    /// Stable string form for logs and payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PasswordSignIn => "password_sign_in",
            Self::PasswordSignUp => "password_sign_up",
            Self::OAuth => "oauth",
            Self::SessionRestore => "session_restore",
            Self::EmailVerification => "email_verification",
        }
    }
}

impl fmt::Display for AuthPathway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuthPathway {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "password_sign_in" => Ok(Self::PasswordSignIn),
            "password_sign_up" => Ok(Self::PasswordSignUp),
            "oauth" => Ok(Self::OAuth),
            "session_restore" => Ok(Self::SessionRestore),
            "email_verification" => Ok(Self::EmailVerification),
            _ => Err(value.to_string()),
        }
    }
}

/// An identity authenticated by the external provider.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthIdentity {
    /// Provider subject identifier.
    pub id: IdentityId,
    /// Email address, if the provider shared one.
    #[serde(default)]
    pub email: String,
    /// Username carried in the provider's user metadata, if any.
    #[serde(default)]
    pub username: Option<String>,
    /// Name of the provider that authenticated the identity.
    #[serde(default = "default_provider")]
    pub provider: String,
}

fn default_provider() -> String {
    EMAIL_PROVIDER.to_string()
}

impl AuthIdentity {
    /// Identity authenticated with email and password.
    #[must_use]
    pub fn email(id: IdentityId, email: impl Into<String>, username: Option<String>) -> Self {
        Self {
            id,
            email: email.into(),
            username,
            provider: default_provider(),
        }
    }

    /// Username to record for this identity: the provider-supplied one when
    /// present, otherwise a fabricated one.
    #[must_use]
    pub fn preferred_username(&self, config: &AuthConfig) -> String {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| fabricate_username(&self.id, config), str::to_string)
    }
}

/// Deterministic username for identities that lack one: the configured prefix
/// followed by the first characters of the identity id.
#[must_use]
pub fn fabricate_username(id: &IdentityId, config: &AuthConfig) -> String {
    format!("{}{}", config.username_prefix, id.prefix(config.fabricated_id_len))
}

/// A live provider session.
///
/// The token is the bearer credential clients present to resume or end the
/// session. Every client holds its own.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// Opaque bearer token.
    pub token: String,
    /// Identity the session belongs to.
    pub identity: AuthIdentity,
    /// When the provider issued the session.
    pub issued_at: DateTime<Utc>,
}

impl AuthSession {
    /// Session issued now under a fresh random token.
    #[must_use]
    pub fn issue(identity: AuthIdentity) -> Self {
        Self {
            token: uuid::Uuid::new_v4().simple().to_string(),
            identity,
            issued_at: Utc::now(),
        }
    }
}
