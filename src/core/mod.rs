//! Core types shared across Tradenomix subsystems.

pub mod config;
pub mod errors;
pub mod ids;

pub use config::{
    AuthConfig, FeedConfig, MessagingConfig, ServerConfig, StorageConfig, TradenomixConfig,
};
pub use errors::{TradenomixError, TradenomixResult, ValidationError};
pub use ids::{CommentId, ConversationId, IdError, IdentityId, MessageId, PostId, TraderId};
