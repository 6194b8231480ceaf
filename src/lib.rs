//! # Authgate
//!
//! `authgate` decides whether a login attempt against a multi-user file service
//! is valid and which local user it resolves to. Session issuance happens
//! elsewhere.
//!
//! ## Strategies
//!
//! Exactly one strategy is active per process, chosen from settings at startup:
//!
//! - **`json`** (local): the submitted password is checked against the argon2
//!   hash stored in the user store.
//! - **`ldap`** (directory): the service binds with its own credentials, searches
//!   for the user, then re-binds as the found entry with the submitted password.
//!   Users seen for the first time are provisioned into the local store with the
//!   configured defaults and a freshly allocated home scope.
//!
//! Both strategies can be gated by a reCAPTCHA-style challenge when a secret is
//! configured.
//!
//! ## Failures
//!
//! Every credential problem collapses into [`auth::AuthError::PermissionDenied`]
//! at the strategy boundary. The reason code is for logs only; the HTTP layer
//! answers `401` without detail. Store or allocation failures after the identity
//! was vouched for are [`auth::AuthError::Infrastructure`] and map to `500`.

pub mod api;
pub mod auth;
pub mod cli;
pub mod settings;
pub mod users;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
