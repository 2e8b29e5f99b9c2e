//! Error types for Tradenomix.

use thiserror::Error;

use crate::core::ids::{ConversationId, IdError, PostId, TraderId};

/// Input rejected locally, before any provider or store call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Username missing or blank.
    #[error("Username is required")]
    UsernameRequired,
    /// Email does not look like an address.
    #[error("Invalid email")]
    InvalidEmail,
    /// Password shorter than the configured minimum.
    #[error("Password too short (minimum {min} characters)")]
    PasswordTooShort {
        /// Minimum accepted length.
        min: usize,
    },
    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,
    /// Message body is empty after trimming.
    #[error("Message cannot be empty")]
    EmptyMessage,
    /// Post has neither text nor media.
    #[error("Post needs text or an image")]
    EmptyPost,
    /// Comment body is empty after trimming.
    #[error("Comment cannot be empty")]
    EmptyComment,
    /// A conversation needs two distinct participants.
    #[error("A conversation needs exactly two distinct participants, got {got}")]
    InvalidParticipants {
        /// Number of distinct participants received.
        got: usize,
    },
}

/// Tradenomix error type.
#[derive(Debug, Error)]
pub enum TradenomixError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Local validation failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Requested username already belongs to another identity.
    #[error("Username is already taken: {0}")]
    UsernameTaken(String),
    /// No conversation with this identifier.
    #[error("conversation not found: {0}")]
    ConversationNotFound(ConversationId),
    /// No post with this identifier.
    #[error("post not found: {0}")]
    PostNotFound(PostId),
    /// No trader with this identifier.
    #[error("trader not found: {0}")]
    TraderNotFound(TraderId),
    /// Identity provider rejected the request or was unreachable.
    #[error("authentication failed: {0}")]
    Provider(String),
    /// Malformed identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
    /// Stored record could not be decoded.
    #[error("invalid user record: {0}")]
    InvalidRecord(String),
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// Regex error.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TradenomixError {
    /// Whether the failure stems from user input and can be fixed by the user.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UsernameTaken(_))
    }

    /// Whether the failure is a not-found condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ConversationNotFound(_) | Self::PostNotFound(_) | Self::TraderNotFound(_)
        )
    }
}

/// Convenience result alias.
pub type TradenomixResult<T> = Result<T, TradenomixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_user_facing() {
        let err = TradenomixError::from(ValidationError::PasswordTooShort { min: 8 });
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Password too short (minimum 8 characters)");
    }

    #[test]
    fn test_username_taken_is_validation() {
        let err = TradenomixError::UsernameTaken("trader1".to_string());
        assert!(err.is_validation());
        assert!(!err.is_not_found());
    }
}
