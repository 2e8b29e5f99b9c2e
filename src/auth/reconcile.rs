//! Reconciliation of authenticated identities with application user records.

use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::identity::{AuthIdentity, fabricate_username};
use crate::auth::records::{InsertOutcome, UserRecord, UserRecordStore, now_millis};
use crate::core::config::AuthConfig;
use crate::core::errors::{TradenomixError, TradenomixResult};

/// What to do when the requested username belongs to another identity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UsernamePolicy {
    /// Fail with `UsernameTaken`.
    Exact,
    /// Fall back to the fabricated username, then to the prefixed full id.
    FallbackToFabricated,
}

/// Result of a successful reconciliation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reconciliation {
    /// First authentication of this identity: a record was created.
    Created(UserRecord),
    /// The record already existed: its login timestamps were refreshed.
    Refreshed(UserRecord),
}

impl Reconciliation {
    /// The reconciled record.
    #[must_use]
    pub const fn record(&self) -> &UserRecord {
        match self {
            Self::Created(record) | Self::Refreshed(record) => record,
        }
    }

    /// Consume into the reconciled record.
    #[must_use]
    pub fn into_record(self) -> UserRecord {
        match self {
            Self::Created(record) | Self::Refreshed(record) => record,
        }
    }

    /// Whether a record was created.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Ensures exactly one user record exists per authenticated identity.
///
/// Safe to call repeatedly and concurrently for the same identity: creation goes
/// through the store's atomic insert-if-absent, and an existing record only has
/// its login timestamps refreshed.
#[derive(Clone)]
pub struct Reconciler {
    records: Arc<dyn UserRecordStore>,
    config: AuthConfig,
}

impl Reconciler {
    /// Create a reconciler over `records`.
    #[must_use]
    pub fn new(records: Arc<dyn UserRecordStore>, config: AuthConfig) -> Self {
        Self { records, config }
    }

    /// Create or refresh the record for `identity`.
    ///
    /// `requested_username` overrides the identity's own username when given.
    ///
    /// # Errors
    /// Returns `UsernameTaken` when no acceptable username is free, or a storage error.
    pub async fn reconcile(
        &self,
        identity: &AuthIdentity,
        requested_username: Option<&str>,
        policy: UsernamePolicy,
    ) -> TradenomixResult<Reconciliation> {
        let now = now_millis();
        let (first, fallbacks) = self.candidates(identity, requested_username, policy);

        for username in std::iter::once(&first).chain(&fallbacks) {
            let record = UserRecord::new(
                identity.id.clone(),
                identity.email.clone(),
                username.clone(),
                identity.provider.clone(),
                now,
            );

            match self.records.insert_if_absent(&record).await? {
                InsertOutcome::Inserted => {
                    info!(
                        "Created user record {} ({username}) via {}",
                        identity.id, identity.provider
                    );
                    return Ok(Reconciliation::Created(record));
                }
                InsertOutcome::AlreadyExists => return self.refresh(identity, now).await,
                InsertOutcome::UsernameTaken => {
                    // The username may be held by this very identity.
                    if self.records.find_by_id(&identity.id).await?.is_some() {
                        return self.refresh(identity, now).await;
                    }
                    debug!("Username {username} taken, trying next candidate");
                }
            }
        }

        Err(TradenomixError::UsernameTaken(first))
    }

    async fn refresh(
        &self,
        identity: &AuthIdentity,
        now: chrono::DateTime<chrono::Utc>,
    ) -> TradenomixResult<Reconciliation> {
        let record = self
            .records
            .touch_login(&identity.id, now)
            .await?
            .ok_or_else(|| {
                TradenomixError::InvalidRecord(format!(
                    "record {} disappeared during reconciliation",
                    identity.id
                ))
            })?;
        debug!("Refreshed user record {}", identity.id);
        Ok(Reconciliation::Refreshed(record))
    }

    /// The username to try first, then the fallbacks the policy allows.
    fn candidates(
        &self,
        identity: &AuthIdentity,
        requested_username: Option<&str>,
        policy: UsernamePolicy,
    ) -> (String, Vec<String>) {
        let first = requested_username
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| identity.preferred_username(&self.config), str::to_string);

        let mut fallbacks: Vec<String> = Vec::new();
        if policy == UsernamePolicy::FallbackToFabricated {
            for fallback in [
                fabricate_username(&identity.id, &self.config),
                format!("{}{}", self.config.username_prefix, identity.id),
            ] {
                if fallback != first && !fallbacks.contains(&fallback) {
                    fallbacks.push(fallback);
                }
            }
        }
        (first, fallbacks)
    }
}
