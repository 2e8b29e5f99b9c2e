//! Messaging: conversations, messages and the in-process store that holds them.

pub mod fixtures;
pub mod store;
pub mod types;

pub use fixtures::{SELF_PARTICIPANT, seed_conversations};
pub use store::{ConversationStore, Subscription};
pub use types::{Conversation, Message};
