use crate::{
    api::{self, AppState},
    auth::Authenticator,
    cli::telemetry,
    settings::Settings,
    users::{MemoryUserStore, UserStore},
};
use anyhow::{Context, Result};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub settings: PathBuf,
    pub root: String,
    pub users: Option<PathBuf>,
    pub auth_timeout: Duration,
}

/// Build the application state the server runs with.
///
/// # Errors
/// Returns an error if the settings or the users file cannot be loaded.
pub async fn state(args: &Args) -> Result<AppState> {
    let settings = Settings::load(&args.settings)?;
    debug!("Settings: {:?}", settings);

    let authenticator =
        Authenticator::from_settings(&settings).context("Failed to build authenticator")?;

    let store = match &args.users {
        Some(path) => MemoryUserStore::from_file(path)?,
        None => MemoryUserStore::new(),
    };
    info!("User store seeded with {} users", store.len().await);

    let store: Arc<dyn UserStore> = Arc::new(store);

    Ok(AppState {
        authenticator: Arc::new(authenticator),
        store,
        root: args.root.clone(),
        auth_timeout: args.auth_timeout,
    })
}

/// Execute the server action.
/// # Errors
/// Returns an error if the state cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let state = state(&args).await?;

    let result = api::new(args.port, state).await;

    telemetry::shutdown_tracer();

    result
}
