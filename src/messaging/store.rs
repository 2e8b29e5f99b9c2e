//! In-process conversation store with snapshot subscribers.
//!
//! The store owns the conversation list and the listener registry. Every read hands
//! out an owned copy, and every listener receives its own deep copy of the whole
//! state: once on subscription and again after each mutation, in registration order.
//! Listeners run after the internal lock is released, so a listener may call back
//! into the store.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use tracing::{debug, warn};

use crate::core::errors::{TradenomixError, TradenomixResult, ValidationError};
use crate::core::ids::{ConversationId, IdentityId};
use crate::messaging::fixtures::seed_conversations;
use crate::messaging::types::{Conversation, Message};

type Listener = Arc<dyn Fn(Vec<Conversation>) + Send + Sync>;

#[derive(Default)]
struct StoreState {
    conversations: Vec<Conversation>,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
}

impl StoreState {
    fn position(&self, id: &ConversationId) -> Option<usize> {
        self.conversations.iter().position(|c| &c.id == id)
    }

    fn next_conversation_id(&self) -> TradenomixResult<ConversationId> {
        let mut next = self
            .conversations
            .iter()
            .filter_map(|c| c.id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        loop {
            let candidate = ConversationId::new(next.to_string())?;
            if self.position(&candidate).is_none() {
                return Ok(candidate);
            }
            next += 1;
        }
    }

    fn listeners(&self) -> Vec<Listener> {
        self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}

/// Single in-process source of truth for conversations.
///
/// Cheap to share behind an `Arc`; construct once at startup.
pub struct ConversationStore {
    state: Arc<Mutex<StoreState>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ConversationStore {
    /// Create a store owning `conversations`.
    #[must_use]
    pub fn new(conversations: Vec<Conversation>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                conversations,
                ..StoreState::default()
            })),
        }
    }

    /// Create a store seeded with the demo conversations.
    ///
    /// # Errors
    /// Returns an error if the seed data fails validation.
    pub fn seeded() -> TradenomixResult<Self> {
        Ok(Self::new(seed_conversations(Utc::now())?))
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies of all conversations, in store order.
    #[must_use]
    pub fn get_conversations(&self) -> Vec<Conversation> {
        self.lock().conversations.clone()
    }

    /// Copy of the conversation with `id`, if any.
    #[must_use]
    pub fn get_conversation_by_id(&self, id: &ConversationId) -> Option<Conversation> {
        self.lock().conversations.iter().find(|c| &c.id == id).cloned()
    }

    /// Copies of the conversations `participant` takes part in, most recent first.
    #[must_use]
    pub fn conversations_for(&self, participant: &IdentityId) -> Vec<Conversation> {
        let mut found: Vec<Conversation> = self
            .lock()
            .conversations
            .iter()
            .filter(|c| c.includes(participant))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        found
    }

    /// Messages of a conversation, oldest first.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` if no conversation has this id.
    pub fn messages(&self, id: &ConversationId) -> TradenomixResult<Vec<Message>> {
        let mut messages = self
            .get_conversation_by_id(id)
            .map(|c| c.messages)
            .ok_or_else(|| TradenomixError::ConversationNotFound(id.clone()))?;
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    /// Append `message` to a conversation, refresh its preview and notify listeners.
    ///
    /// # Errors
    /// Returns `ConversationNotFound` if no conversation has this id; the store is
    /// left untouched and no listener is called.
    pub fn send_message(
        &self,
        conversation_id: &ConversationId,
        message: Message,
    ) -> TradenomixResult<Message> {
        let (snapshot, listeners) = {
            let mut state = self.lock();
            let Some(index) = state.position(conversation_id) else {
                warn!("send_message: unknown conversation {conversation_id}");
                return Err(TradenomixError::ConversationNotFound(
                    conversation_id.clone(),
                ));
            };
            state.conversations[index].push(message.clone());
            debug!(
                "Appended message {} to conversation {conversation_id}",
                message.id
            );
            (state.conversations.clone(), state.listeners())
        };

        notify(&listeners, &snapshot);
        Ok(message)
    }

    /// Build a message from `sender` stamped now and send it.
    ///
    /// # Errors
    /// Returns `EmptyMessage` for blank content, or `ConversationNotFound`.
    pub fn compose_message(
        &self,
        conversation_id: &ConversationId,
        sender: IdentityId,
        content: &str,
    ) -> TradenomixResult<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        self.send_message(conversation_id, Message::new(sender, content))
    }

    /// Open a conversation between two participants.
    ///
    /// Returns the existing conversation if the pair already has one; otherwise
    /// creates an empty one with the next numeric id and notifies listeners.
    ///
    /// # Errors
    /// Returns `InvalidParticipants` unless exactly two distinct participants are given.
    pub fn create_conversation(
        &self,
        participants: Vec<IdentityId>,
    ) -> TradenomixResult<Conversation> {
        let distinct: HashSet<&IdentityId> = participants.iter().collect();
        if participants.len() != 2 || distinct.len() != 2 {
            return Err(ValidationError::InvalidParticipants {
                got: distinct.len(),
            }
            .into());
        }

        let (created, snapshot, listeners) = {
            let mut state = self.lock();
            if let Some(existing) = state
                .conversations
                .iter()
                .find(|c| participants.iter().all(|p| c.includes(p)))
            {
                return Ok(existing.clone());
            }

            let conversation = Conversation {
                id: state.next_conversation_id()?,
                participants,
                last_message: String::new(),
                last_message_at: Utc::now(),
                messages: Vec::new(),
            };
            debug!("Created conversation {}", conversation.id);
            state.conversations.push(conversation.clone());
            (conversation, state.conversations.clone(), state.listeners())
        };

        notify(&listeners, &snapshot);
        Ok(created)
    }

    /// Register a listener.
    ///
    /// The listener is called with a snapshot of the state at registration before
    /// this returns, then again after every mutation until
    /// [`Subscription::unsubscribe`] is called. Dropping the subscription does not
    /// unsubscribe.
    ///
    /// Deliveries happen outside the lock and are not serialized across threads: a
    /// mutation racing with this call may reach the new listener before its
    /// registration snapshot does, so a listener must not assume its first call is
    /// the oldest state. Calls made from a single thread arrive in order.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Vec<Conversation>) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let (id, snapshot) = {
            let mut state = self.lock();
            let id = state.next_listener_id;
            state.next_listener_id += 1;
            state.listeners.push((id, Arc::clone(&listener)));
            (id, state.conversations.clone())
        };
        debug!("Listener {id} subscribed");

        listener(snapshot);

        Subscription {
            state: Arc::downgrade(&self.state),
            id,
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

fn notify(listeners: &[Listener], snapshot: &[Conversation]) {
    for listener in listeners {
        listener(snapshot.to_vec());
    }
}

/// Handle returned by [`ConversationStore::subscribe`].
///
/// Dropping the handle does not unsubscribe.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    state: Weak<Mutex<StoreState>>,
    id: u64,
}

impl Subscription {
    /// Remove the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        let before = state.listeners.len();
        state.listeners.retain(|(id, _)| *id != self.id);
        if state.listeners.len() != before {
            debug!("Listener {} unsubscribed", self.id);
        }
    }
}
