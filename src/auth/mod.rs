//! Authentication bootstrap.
//!
//! - `validators`: local checks on credentials and sign-up forms
//! - `identity`: authenticated identities, pathways and fabricated usernames
//! - `provider`: the external identity provider seam and an in-process implementation
//! - `records`: application user records and their `SQLite` store
//! - `reconcile`: idempotent create-or-refresh of user records
//! - `service`: the entry points used by each authentication flow

pub mod identity;
pub mod provider;
pub mod reconcile;
pub mod records;
pub mod service;
pub mod validators;

pub use identity::{AuthIdentity, AuthPathway, AuthSession, EMAIL_PROVIDER, fabricate_username};
pub use provider::{IdentityProvider, InMemoryIdentityProvider, ProviderFuture, SignUp};
pub use reconcile::{Reconciler, Reconciliation, UsernamePolicy};
pub use records::{InsertOutcome, SqliteUserRecordStore, StoreFuture, UserRecord, UserRecordStore};
pub use service::{AuthOutcome, AuthService, Notice, NoticeLevel};
pub use validators::{
    CredentialValidator, PasswordStrength, SignupForm, is_strong_password, password_strength,
};
