//! Conversation and message records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::{ConversationId, IdentityId, MessageId};

/// A message inside a conversation. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Author of the message.
    pub sender_id: IdentityId,
    /// Text content.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a message with a fresh id, stamped now.
    #[must_use]
    pub fn new(sender_id: IdentityId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            sender_id,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A two-party thread with denormalized preview fields for list display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Ordered participant identifiers.
    pub participants: Vec<IdentityId>,
    /// Text of the most recent message.
    pub last_message: String,
    /// Timestamp of the most recent message.
    pub last_message_at: DateTime<Utc>,
    /// Messages in append order.
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Whether `participant` takes part in this conversation.
    #[must_use]
    pub fn includes(&self, participant: &IdentityId) -> bool {
        self.participants.contains(participant)
    }

    /// Append a message and refresh the preview fields.
    pub(crate) fn push(&mut self, message: Message) {
        self.last_message.clone_from(&message.content);
        self.last_message_at = message.created_at;
        self.messages.push(message);
    }
}
