//! Authentication entry points used by the login, sign-up and callback flows.
//!
//! Every entry point authenticates through the [`IdentityProvider`] and then
//! reconciles the identity with its user record. Provider failures abort the flow
//! with an error. Reconciliation failures do not: they are reported as an error
//! [`Notice`] and the caller is still routed to its destination.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::auth::identity::{AuthIdentity, AuthPathway, AuthSession};
use crate::auth::provider::IdentityProvider;
use crate::auth::reconcile::{Reconciler, UsernamePolicy};
use crate::auth::records::{UserRecord, UserRecordStore};
use crate::auth::validators::{CredentialValidator, SignupForm};
use crate::core::config::AuthConfig;
use crate::core::errors::{TradenomixError, TradenomixResult};

/// Path of the OAuth callback page on the web client.
pub const OAUTH_CALLBACK_PATH: &str = "/auth/callback";

/// Severity of a user-visible notice.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Something worked.
    Success,
    /// Informational.
    Info,
    /// Something failed but the flow continued.
    Error,
}

/// A message for the user, rendered by the client as a toast.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notice {
    /// Success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Informational notice.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// Error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Result of an authentication flow.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOutcome {
    /// Pathway that produced the identity.
    pub pathway: AuthPathway,
    /// Authenticated identity.
    pub identity: AuthIdentity,
    /// Reconciled user record, when reconciliation succeeded.
    pub record: Option<UserRecord>,
    /// Bearer token of the session this flow opened or resumed. `None` while
    /// the email address awaits verification.
    pub session_token: Option<String>,
    /// Whether the user still has to verify their email address.
    pub awaiting_verification: bool,
    /// Client route to navigate to.
    pub destination: String,
    /// Notices to show, in order.
    pub notices: Vec<Notice>,
}

impl AuthOutcome {
    fn with_token(mut self, token: String) -> Self {
        self.session_token = Some(token);
        self
    }
}

/// Authentication service.
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    records: Arc<dyn UserRecordStore>,
    reconciler: Reconciler,
    validator: CredentialValidator,
    config: AuthConfig,
}

impl AuthService {
    /// Build the service.
    ///
    /// # Errors
    /// Returns an error if the credential validator cannot be built.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        records: Arc<dyn UserRecordStore>,
        config: AuthConfig,
    ) -> TradenomixResult<Self> {
        Ok(Self {
            reconciler: Reconciler::new(Arc::clone(&records), config.clone()),
            validator: CredentialValidator::new(&config)?,
            provider,
            records,
            config,
        })
    }

    /// Credential validator used by the sign-up flow.
    #[must_use]
    pub const fn validator(&self) -> &CredentialValidator {
        &self.validator
    }

    /// Whether another identity already holds `username`.
    ///
    /// # Errors
    /// Returns an error if the record store fails.
    pub async fn is_username_taken(&self, username: &str) -> TradenomixResult<bool> {
        Ok(self.records.find_by_username(username.trim()).await?.is_some())
    }

    /// Email/password sign-in.
    ///
    /// # Errors
    /// Returns `Provider` if the credentials are rejected.
    pub async fn sign_in(&self, email: &str, password: &str) -> TradenomixResult<AuthOutcome> {
        let session = self
            .provider
            .sign_in_with_password(email.trim(), password)
            .await?;
        let outcome = self
            .finish(
                AuthPathway::PasswordSignIn,
                session.identity,
                None,
                UsernamePolicy::FallbackToFabricated,
                Some(Notice::success("Welcome back!")),
            )
            .await;
        Ok(outcome.with_token(session.token))
    }

    /// Email/password sign-up.
    ///
    /// The form is validated and the username checked for availability before the
    /// provider is contacted.
    ///
    /// # Errors
    /// Returns `Validation` or `UsernameTaken` for bad input, `Provider` if the
    /// provider refuses the registration.
    pub async fn sign_up(&self, form: &SignupForm) -> TradenomixResult<AuthOutcome> {
        self.validator.validate_signup(form)?;

        let username = form.username.trim();
        if self.is_username_taken(username).await? {
            return Err(TradenomixError::UsernameTaken(username.to_string()));
        }

        let signup = self
            .provider
            .sign_up(form.email.trim(), &form.password, username)
            .await?;

        let session_token = signup.session.map(|session| session.token);
        let awaiting_verification = session_token.is_none();
        let greeting = if awaiting_verification {
            Notice::info("Check your email to verify")
        } else {
            Notice::success("Account created!")
        };

        let mut outcome = self
            .finish(
                AuthPathway::PasswordSignUp,
                signup.identity,
                Some(username),
                UsernamePolicy::Exact,
                Some(greeting),
            )
            .await;

        outcome.session_token = session_token;
        if awaiting_verification {
            outcome.awaiting_verification = true;
            outcome.destination.clone_from(&self.config.auth_route);
        }
        Ok(outcome)
    }

    /// URL to redirect the browser to for an OAuth login with `provider`.
    ///
    /// # Errors
    /// Returns `Url` if the configured site URL is invalid, or `Provider`.
    pub async fn begin_oauth(&self, provider: &str) -> TradenomixResult<Url> {
        let redirect = Url::parse(&self.config.site_url)?.join(OAUTH_CALLBACK_PATH)?;
        self.provider.oauth_authorize_url(provider, &redirect).await
    }

    /// OAuth callback: pick up the session the provider handed back under `token`.
    ///
    /// # Errors
    /// Returns `Provider` if `token` names no live session.
    pub async fn complete_oauth(&self, token: &str) -> TradenomixResult<AuthOutcome> {
        let session = self.require_session(token).await?;
        let outcome = self
            .finish(
                AuthPathway::OAuth,
                session.identity,
                None,
                UsernamePolicy::FallbackToFabricated,
                Some(Notice::success("Welcome!")),
            )
            .await;
        Ok(outcome.with_token(session.token))
    }

    /// Email-verification callback for the session opened by the verification link.
    ///
    /// # Errors
    /// Returns `Provider` if `token` names no live session.
    pub async fn verify_email(&self, token: &str) -> TradenomixResult<AuthOutcome> {
        let session = self.require_session(token).await?;
        let outcome = self
            .finish(
                AuthPathway::EmailVerification,
                session.identity,
                None,
                UsernamePolicy::FallbackToFabricated,
                Some(Notice::success("Email verified!")),
            )
            .await;
        Ok(outcome.with_token(session.token))
    }

    /// Resume the session held under `token`. `None` when it is unknown or signed out.
    ///
    /// # Errors
    /// Returns `Provider` if the session cannot be retrieved.
    pub async fn restore_session(&self, token: &str) -> TradenomixResult<Option<AuthOutcome>> {
        let Some(session) = self.provider.current_session(token).await? else {
            return Ok(None);
        };
        let outcome = self
            .finish(
                AuthPathway::SessionRestore,
                session.identity,
                None,
                UsernamePolicy::FallbackToFabricated,
                None,
            )
            .await;
        Ok(Some(outcome.with_token(session.token)))
    }

    /// End the session held under `token`.
    ///
    /// # Errors
    /// Returns `Provider` if the provider fails.
    pub async fn sign_out(&self, token: &str) -> TradenomixResult<()> {
        self.provider.sign_out(token).await
    }

    async fn require_session(&self, token: &str) -> TradenomixResult<AuthSession> {
        self.provider.current_session(token).await?.ok_or_else(|| {
            TradenomixError::Provider("Authentication failed. Try again.".to_string())
        })
    }

    async fn finish(
        &self,
        pathway: AuthPathway,
        identity: AuthIdentity,
        requested_username: Option<&str>,
        policy: UsernamePolicy,
        greeting: Option<Notice>,
    ) -> AuthOutcome {
        let mut notices: Vec<Notice> = greeting.into_iter().collect();
        let record = match self
            .reconciler
            .reconcile(&identity, requested_username, policy)
            .await
        {
            Ok(reconciled) => Some(reconciled.into_record()),
            Err(err) => {
                warn!("Reconciliation failed for {} via {pathway}: {err}", identity.id);
                notices.push(Notice::error(format!("Failed to init user: {err}")));
                None
            }
        };
        info!("{pathway} completed for {}", identity.id);

        AuthOutcome {
            pathway,
            identity,
            record,
            session_token: None,
            awaiting_verification: false,
            destination: self.config.home_route.clone(),
            notices,
        }
    }
}
