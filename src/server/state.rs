//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::auth::{AuthService, IdentityProvider, Reconciler, UserRecordStore};
use crate::core::config::TradenomixConfig;
use crate::core::errors::TradenomixResult;
use crate::feed::PostStore;
use crate::messaging::ConversationStore;

/// Shared application state.
pub struct AppState {
    /// Effective configuration.
    pub config: TradenomixConfig,
    /// Conversation store.
    pub conversations: Arc<ConversationStore>,
    /// Post feed.
    pub posts: Arc<PostStore>,
    /// Authentication flows.
    pub auth: AuthService,
    /// Direct record reconciliation, for clients that authenticate elsewhere.
    pub reconciler: Reconciler,
}

impl AppState {
    /// Create the application state.
    ///
    /// The conversation and post stores start from the demo fixtures when their
    /// `seed_fixtures` flag is set, empty otherwise.
    ///
    /// # Errors
    /// Returns an error if the fixtures or the auth service cannot be built.
    pub fn new(
        config: TradenomixConfig,
        provider: Arc<dyn IdentityProvider>,
        records: Arc<dyn UserRecordStore>,
    ) -> TradenomixResult<Arc<Self>> {
        let conversations = if config.messaging.seed_fixtures {
            ConversationStore::seeded()?
        } else {
            ConversationStore::default()
        };

        let posts = if config.feed.seed_fixtures {
            PostStore::seeded()?
        } else {
            PostStore::default()
        };

        let auth = AuthService::new(provider, Arc::clone(&records), config.auth.clone())?;
        let reconciler = Reconciler::new(records, config.auth.clone());

        Ok(Arc::new(Self {
            config,
            conversations: Arc::new(conversations),
            posts: Arc::new(posts),
            auth,
            reconciler,
        }))
    }
}
