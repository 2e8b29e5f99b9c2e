//! Startup helpers for the Tradenomix server.

use std::process::ExitCode;
use std::sync::Arc;

use crate::auth::{InMemoryIdentityProvider, SqliteUserRecordStore};
use crate::core::config::TradenomixConfig;
use crate::server::{self, AppState, ServeError};

/// Run the server (used by the `tradenomix-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Tradenomix v{}", env!("CARGO_PKG_VERSION"));

    let config = match TradenomixConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let state = match rt.block_on(initialize(config)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create state: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server(state)) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Open the user record database and build the application state.
///
/// Identities come from the in-process provider.
///
/// # Errors
/// Returns an error if the database cannot be opened or the state cannot be built.
pub async fn initialize(config: TradenomixConfig) -> Result<Arc<AppState>, ServeError> {
    tracing::info!("User records: {}", config.storage.sqlite_path.display());
    let records = SqliteUserRecordStore::new(&config.storage).await?;
    let state = AppState::new(
        config,
        Arc::new(InMemoryIdentityProvider::new()),
        Arc::new(records),
    )?;
    Ok(state)
}
