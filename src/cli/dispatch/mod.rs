use crate::cli::{
    actions::{Action, server::Args},
    commands::{ARG_AUTH_TIMEOUT, ARG_PORT, ARG_ROOT, ARG_SETTINGS, ARG_USERS},
};
use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let settings = matches
        .get_one::<PathBuf>(ARG_SETTINGS)
        .cloned()
        .context("missing required argument: --settings")?;
    let root = matches
        .get_one::<String>(ARG_ROOT)
        .cloned()
        .unwrap_or_else(|| ".".to_string());
    let users = matches.get_one::<PathBuf>(ARG_USERS).cloned();
    let auth_timeout = Duration::from_secs(
        matches
            .get_one::<u64>(ARG_AUTH_TIMEOUT)
            .copied()
            .unwrap_or(10),
    );

    Ok(Action::Server(Args {
        port,
        settings,
        root,
        users,
        auth_timeout,
    }))
}
