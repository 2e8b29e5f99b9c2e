//! Identifier types for Tradenomix.
//!
//! Identifiers are opaque strings: conversation, post and trader ids come from
//! fixtures or a numeric sequence (`"1"`, `"2"`), message and comment ids from
//! fixtures (`"m1"`, `"c1"`) or generated UUIDs, and
//! identity ids are whatever subject the external identity provider hands out.
//! Each kind gets its own newtype so they cannot be mixed up.
//!
//! ## Cargo features used by this module
//! - `uuid_v7`: generated message and comment ids use `UUIDv7` for insert locality.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate an ID intended to have good DB insert locality.
#[inline]
#[must_use]
fn uuid_time_ordered() -> Uuid {
    #[cfg(feature = "uuid_v7")]
    {
        Uuid::now_v7()
    }
    #[cfg(not(feature = "uuid_v7"))]
    {
        Uuid::new_v4()
    }
}

/// Errors returned when parsing/validating an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Empty (or whitespace-only) identifier.
    Empty,
    /// Exceeds the maximum accepted length.
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length received.
        got: usize,
    },
    /// Contains whitespace or a control character.
    InvalidChar {
        /// The invalid character.
        ch: char,
        /// The index where it was found.
        index: usize,
    },
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "id must not be empty"),
            Self::TooLong { max, got } => write!(f, "id too long: got {got}, max {max}"),
            Self::InvalidChar { ch, index } => {
                write!(f, "id contains invalid character {ch:?} at index {index}")
            }
        }
    }
}

impl std::error::Error for IdError {}

/// Hard ceiling to prevent pathological payloads.
pub const MAX_ID_LEN: usize = 128;

fn validate_id(raw: &str) -> Result<&str, IdError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(IdError::Empty);
    }
    if s.len() > MAX_ID_LEN {
        return Err(IdError::TooLong {
            max: MAX_ID_LEN,
            got: s.len(),
        });
    }
    if let Some((index, ch)) = s
        .chars()
        .enumerate()
        .find(|(_, ch)| ch.is_whitespace() || ch.is_control())
    {
        return Err(IdError::InvalidChar { ch, index });
    }
    Ok(s)
}

/// Declare a string newtype with a consistent API.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Build a validated identifier.
            ///
            /// # Errors
            /// Returns `IdError` if the input is empty, too long, or contains
            /// whitespace/control characters.
            pub fn new(raw: impl AsRef<str>) -> Result<Self, IdError> {
                validate_id(raw.as_ref()).map(|s| Self(s.to_owned()))
            }

            /// Borrow as `&str`.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into `String`.
            #[inline]
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.into_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

define_string_id!(
    /// Identifier of a two-party conversation.
    ConversationId
);

define_string_id!(
    /// Identifier of a message within a conversation.
    MessageId
);

define_string_id!(
    /// Subject identifier issued by the identity provider.
    ///
    /// Also the primary key of the application user record.
    IdentityId
);

define_string_id!(
    /// Identifier of a trader profile in the public directory.
    TraderId
);

define_string_id!(
    /// Identifier of a feed post.
    PostId
);

define_string_id!(
    /// Identifier of a comment on a post.
    CommentId
);

impl CommentId {
    /// Generate a fresh comment identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid_time_ordered().to_string())
    }
}

impl MessageId {
    /// Generate a fresh message identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid_time_ordered().to_string())
    }
}

impl IdentityId {
    /// First `len` characters of the identifier (the whole id if shorter).
    #[must_use]
    pub fn prefix(&self, len: usize) -> &str {
        match self.0.char_indices().nth(len) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

// ===== Rusqlite integration ================================================

mod rusqlite_impl {
    use super::IdentityId;

    use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

    impl ToSql for IdentityId {
        fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
            Ok(ToSqlOutput::from(self.as_str()))
        }
    }

    impl FromSql for IdentityId {
        fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
            match value {
                ValueRef::Text(t) => {
                    let s = std::str::from_utf8(t).map_err(|e| FromSqlError::Other(Box::new(e)))?;
                    Self::new(s).map_err(|e| FromSqlError::Other(Box::new(e)))
                }
                _ => Err(FromSqlError::InvalidType),
            }
        }
    }
}
