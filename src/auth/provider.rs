//! External identity-and-session provider seam.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::auth::identity::{AuthIdentity, AuthSession, EMAIL_PROVIDER};
use crate::core::errors::{TradenomixError, TradenomixResult};
use crate::core::ids::IdentityId;

/// Boxed future type for provider operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a password sign-up.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignUp {
    /// Newly registered identity.
    pub identity: AuthIdentity,
    /// Session, when the provider signs the user in straight away. `None` when
    /// the email address must be verified first.
    pub session: Option<AuthSession>,
}

/// Identity provider operations used by the auth bootstrap.
pub trait IdentityProvider: Send + Sync {
    /// Authenticate with email and password.
    ///
    /// # Errors
    /// Returns `Provider` if the credentials are rejected or the provider fails.
    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> ProviderFuture<'a, TradenomixResult<AuthSession>>;

    /// Register a new email/password identity carrying `username` as metadata.
    ///
    /// # Errors
    /// Returns `Provider` if the provider refuses the registration.
    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
        username: &'a str,
    ) -> ProviderFuture<'a, TradenomixResult<SignUp>>;

    /// URL to send the browser to for an OAuth login with `provider`.
    ///
    /// # Errors
    /// Returns `Provider` for unsupported providers.
    fn oauth_authorize_url<'a>(
        &'a self,
        provider: &'a str,
        redirect_to: &'a Url,
    ) -> ProviderFuture<'a, TradenomixResult<Url>>;

    /// The live session issued under `token`, if any.
    ///
    /// # Errors
    /// Returns `Provider` if the session cannot be retrieved.
    fn current_session<'a>(
        &'a self,
        token: &'a str,
    ) -> ProviderFuture<'a, TradenomixResult<Option<AuthSession>>>;

    /// End the session issued under `token`. Unknown tokens are ignored.
    ///
    /// # Errors
    /// Returns `Provider` if the provider fails.
    fn sign_out<'a>(&'a self, token: &'a str) -> ProviderFuture<'a, TradenomixResult<()>>;
}

#[derive(Clone, Debug)]
struct Account {
    identity: AuthIdentity,
    password: String,
    confirmed: bool,
}

#[derive(Debug, Default)]
struct ProviderState {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, AuthSession>,
}

impl ProviderState {
    fn open_session(&mut self, identity: AuthIdentity) -> AuthSession {
        let session = AuthSession::issue(identity);
        self.sessions.insert(session.token.clone(), session.clone());
        session
    }
}

/// In-process identity provider for local development and tests.
///
/// Holds accounts and token-keyed sessions in memory and simulates the OAuth
/// round-trip through [`InMemoryIdentityProvider::complete_oauth_login`].
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    state: RwLock<ProviderState>,
    require_email_confirmation: bool,
    oauth_base: Option<Url>,
}

impl InMemoryIdentityProvider {
    /// Provider that signs users in immediately after sign-up.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that requires email verification before sign-up yields a session.
    #[must_use]
    pub fn with_email_confirmation() -> Self {
        Self {
            require_email_confirmation: true,
            ..Self::default()
        }
    }

    /// Use `base` as the authorize endpoint for OAuth URLs.
    #[must_use]
    pub fn with_oauth_base(mut self, base: Url) -> Self {
        self.oauth_base = Some(base);
        self
    }

    /// Simulate the provider redirecting back after an OAuth login. The
    /// returned session's token is what the callback page receives.
    pub async fn complete_oauth_login(&self, identity: AuthIdentity) -> AuthSession {
        debug!("OAuth login completed for {}", identity.id);
        self.state.write().await.open_session(identity)
    }

    /// Simulate the user following the verification link sent to `email`.
    /// Returns the session the link signs in.
    ///
    /// # Errors
    /// Returns `Provider` if no account is registered for `email`.
    pub async fn confirm_email(&self, email: &str) -> TradenomixResult<AuthSession> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(&email.to_lowercase())
            .ok_or_else(|| TradenomixError::Provider("Unknown email".to_string()))?;
        account.confirmed = true;
        let identity = account.identity.clone();
        Ok(state.open_session(identity))
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> ProviderFuture<'a, TradenomixResult<AuthSession>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let account = state
                .accounts
                .get(&email.to_lowercase())
                .filter(|account| account.password == password)
                .ok_or_else(|| {
                    TradenomixError::Provider("Invalid login credentials".to_string())
                })?;
            if !account.confirmed {
                return Err(TradenomixError::Provider("Email not confirmed".to_string()));
            }
            let identity = account.identity.clone();
            Ok(state.open_session(identity))
        })
    }

    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
        username: &'a str,
    ) -> ProviderFuture<'a, TradenomixResult<SignUp>> {
        Box::pin(async move {
            let key = email.to_lowercase();
            let mut state = self.state.write().await;
            if state.accounts.contains_key(&key) {
                return Err(TradenomixError::Provider(
                    "User already registered".to_string(),
                ));
            }

            let identity = AuthIdentity {
                id: IdentityId::new(uuid::Uuid::new_v4().to_string())?,
                email: email.to_string(),
                username: Some(username.to_string()),
                provider: EMAIL_PROVIDER.to_string(),
            };
            let confirmed = !self.require_email_confirmation;
            state.accounts.insert(
                key,
                Account {
                    identity: identity.clone(),
                    password: password.to_string(),
                    confirmed,
                },
            );

            let session = confirmed.then(|| state.open_session(identity.clone()));
            Ok(SignUp { identity, session })
        })
    }

    fn oauth_authorize_url<'a>(
        &'a self,
        provider: &'a str,
        redirect_to: &'a Url,
    ) -> ProviderFuture<'a, TradenomixResult<Url>> {
        Box::pin(async move {
            if provider != "google" {
                return Err(TradenomixError::Provider(format!(
                    "Unsupported provider: {provider}"
                )));
            }
            let mut url = match &self.oauth_base {
                Some(base) => base.join("authorize")?,
                None => Url::parse("http://localhost/auth/v1/authorize")?,
            };
            url.query_pairs_mut()
                .append_pair("provider", provider)
                .append_pair("redirect_to", redirect_to.as_str());
            Ok(url)
        })
    }

    fn current_session<'a>(
        &'a self,
        token: &'a str,
    ) -> ProviderFuture<'a, TradenomixResult<Option<AuthSession>>> {
        Box::pin(async move { Ok(self.state.read().await.sessions.get(token).cloned()) })
    }

    fn sign_out<'a>(&'a self, token: &'a str) -> ProviderFuture<'a, TradenomixResult<()>> {
        Box::pin(async move {
            if self.state.write().await.sessions.remove(token).is_some() {
                debug!("Session closed");
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let provider = InMemoryIdentityProvider::new();
        let signup = provider
            .sign_up("Trader@Desk.io", "hunter22!", "trader1")
            .await
            .unwrap();
        assert!(signup.session.is_some());
        assert_eq!(signup.identity.username.as_deref(), Some("trader1"));

        let session = provider
            .sign_in_with_password("trader@desk.io", "hunter22!")
            .await
            .unwrap();
        assert_eq!(session.identity.id, signup.identity.id);

        let wrong = provider.sign_in_with_password("trader@desk.io", "nope").await;
        assert!(matches!(wrong, Err(TradenomixError::Provider(_))));
    }

    #[tokio::test]
    async fn test_confirmation_gates_session() {
        let provider = InMemoryIdentityProvider::with_email_confirmation();
        let signup = provider.sign_up("a@b.io", "password1", "alpha").await.unwrap();
        assert!(signup.session.is_none());
        assert!(provider.sign_in_with_password("a@b.io", "password1").await.is_err());

        let confirmed = provider.confirm_email("a@b.io").await.unwrap();
        let session = provider
            .current_session(&confirmed.token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.identity.id, signup.identity.id);
    }

    #[tokio::test]
    async fn test_oauth_url_carries_redirect() {
        let provider = InMemoryIdentityProvider::new();
        let redirect = Url::parse("http://localhost:5173/auth/callback").unwrap();
        let url = provider
            .oauth_authorize_url("google", &redirect)
            .await
            .unwrap();
        assert!(url.as_str().contains("provider=google"));
        assert!(url.query().unwrap_or_default().contains("redirect_to="));
        assert!(provider.oauth_authorize_url("myspace", &redirect).await.is_err());
    }

    #[tokio::test]
    async fn test_sign_out_clears_only_that_session() {
        let provider = InMemoryIdentityProvider::new();
        let google = provider
            .complete_oauth_login(AuthIdentity {
                id: IdentityId::new("g-1").unwrap(),
                email: "g@x.io".to_string(),
                username: None,
                provider: "google".to_string(),
            })
            .await;
        provider.sign_up("b@x.io", "password1", "beta").await.unwrap();
        let other = provider
            .sign_in_with_password("b@x.io", "password1")
            .await
            .unwrap();

        provider.sign_out(&google.token).await.unwrap();
        assert!(provider.current_session(&google.token).await.unwrap().is_none());
        assert!(provider.current_session(&other.token).await.unwrap().is_some());

        provider.sign_out("not-a-token").await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_token_has_no_session() {
        let provider = InMemoryIdentityProvider::new();
        provider.sign_up("c@x.io", "password1", "gamma").await.unwrap();
        assert!(provider.current_session("").await.unwrap().is_none());
        assert!(provider.current_session("guess").await.unwrap().is_none());
    }
}
