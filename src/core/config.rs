//! Configuration for Tradenomix.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::errors::{TradenomixError, TradenomixResult};

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TradenomixConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// User record storage settings.
    pub storage: StorageConfig,
    /// Authentication settings.
    pub auth: AuthConfig,
    /// Messaging settings.
    pub messaging: MessagingConfig,
    /// Post feed settings.
    pub feed: FeedConfig,
}

impl TradenomixConfig {
    /// Build the default configuration and apply `TRADENOMIX_*` environment overrides.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed or the result is invalid.
    pub fn from_env() -> TradenomixResult<Self> {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("TRADENOMIX_PORT") {
            config.server.port = port.parse().map_err(|_| {
                TradenomixError::InvalidConfig(format!("TRADENOMIX_PORT is not a port: {port}"))
            })?;
        }
        if let Ok(path) = std::env::var("TRADENOMIX_DB_PATH") {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        if let Ok(site_url) = std::env::var("TRADENOMIX_SITE_URL") {
            config.auth.site_url = site_url;
        }
        if let Ok(seed) = std::env::var("TRADENOMIX_SEED_FIXTURES") {
            let seed = matches!(seed.as_str(), "1" | "true" | "yes");
            config.messaging.seed_fixtures = seed;
            config.feed.seed_fixtures = seed;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> TradenomixResult<()> {
        if self.server.port == 0 {
            return Err(TradenomixError::InvalidConfig(
                "server.port must be > 0".to_string(),
            ));
        }

        if self.auth.min_password_len < 6 {
            return Err(TradenomixError::InvalidConfig(
                "auth.min_password_len must be >= 6".to_string(),
            ));
        }

        if self.auth.username_prefix.trim().is_empty() {
            return Err(TradenomixError::InvalidConfig(
                "auth.username_prefix must not be empty".to_string(),
            ));
        }

        if self.auth.fabricated_id_len < 4 {
            return Err(TradenomixError::InvalidConfig(
                "auth.fabricated_id_len must be >= 4".to_string(),
            ));
        }

        if self.feed.default_limit == 0 || self.feed.default_limit > self.feed.max_limit {
            return Err(TradenomixError::InvalidConfig(
                "feed.default_limit must be in 1..=feed.max_limit".to_string(),
            ));
        }

        Url::parse(&self.auth.site_url)?;

        Ok(())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

/// Storage configuration for user records.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// User record table name.
    pub users_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("tradenomix.sqlite"),
            users_table: "users".to_string(),
        }
    }
}

/// Authentication settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Public origin of the web client, used to build OAuth redirect URLs.
    pub site_url: String,
    /// Minimum password length accepted at sign-up.
    pub min_password_len: usize,
    /// Prefix of usernames fabricated for identities without one.
    pub username_prefix: String,
    /// Number of identity-id characters appended to fabricated usernames.
    pub fabricated_id_len: usize,
    /// Route the client lands on after authenticating.
    pub home_route: String,
    /// Route the client is sent back to when authentication fails.
    pub auth_route: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:5173".to_string(),
            min_password_len: 8,
            username_prefix: "user_".to_string(),
            fabricated_id_len: 8,
            home_route: "/feed".to_string(),
            auth_route: "/auth".to_string(),
        }
    }
}

/// Messaging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Seed the conversation store with the demo conversations.
    pub seed_fixtures: bool,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            seed_fixtures: true,
        }
    }
}

/// Post feed settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Seed the post store with the demo posts and comments.
    pub seed_fixtures: bool,
    /// Posts returned when the client gives no limit.
    pub default_limit: usize,
    /// Ceiling applied to client-supplied limits.
    pub max_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            seed_fixtures: true,
            default_limit: 20,
            max_limit: 100,
        }
    }
}
