//! Authentication strategies.
//!
//! Flow: decode the [`CredentialEnvelope`], pass the optional challenge gate, then let
//! the active strategy resolve a [`LocalUser`]. The strategy is picked once from
//! [`Settings`] and never switched while the process runs.

pub mod challenge;
pub mod credentials;
pub mod directory;
pub mod local;

pub use challenge::{ChallengeConfig, ChallengeError, ChallengeVerifier};
pub use credentials::CredentialEnvelope;
pub use directory::{
    DirectoryAuthenticator, DirectoryClient, DirectoryError, DirectoryFailure, DirectoryIdentity,
};
pub use local::LocalAuthenticator;

use crate::{
    settings::{AuthMethod, Settings},
    users::{HomeDirAllocator, LocalUser, UserStore},
};
use anyhow::Result;
use async_trait::async_trait;
use std::{fmt, sync::Arc};
use thiserror::Error;

/// Internal reason for a denial. Logged, never returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MalformedRequest,
    ChallengeRejected,
    ChallengeUnavailable,
    UnknownUser,
    InvalidCredentials,
    Directory(DirectoryFailure),
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRequest => f.write_str("malformed_request"),
            Self::ChallengeRejected => f.write_str("challenge_rejected"),
            Self::ChallengeUnavailable => f.write_str("challenge_unavailable"),
            Self::UnknownUser => f.write_str("unknown_user"),
            Self::InvalidCredentials => f.write_str("invalid_credentials"),
            Self::Directory(failure) => write!(f, "directory_{failure}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("permission denied: {reason}")]
    PermissionDenied {
        reason: DenyReason,
        #[source]
        source: Option<anyhow::Error>,
    },
    /// Not a verdict on the credentials; the caller should answer with a server error.
    #[error("authentication infrastructure failure: {0:#}")]
    Infrastructure(anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub const fn denied(reason: DenyReason) -> Self {
        Self::PermissionDenied {
            reason,
            source: None,
        }
    }

    #[must_use]
    pub fn denied_with(reason: DenyReason, source: impl Into<anyhow::Error>) -> Self {
        Self::PermissionDenied {
            reason,
            source: Some(source.into()),
        }
    }

    #[must_use]
    pub fn infrastructure(source: impl Into<anyhow::Error>) -> Self {
        Self::Infrastructure(source.into())
    }

    #[must_use]
    pub const fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::PermissionDenied { reason, .. } => Some(*reason),
            Self::Infrastructure(_) => None,
        }
    }

    #[must_use]
    pub const fn is_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Capability every concrete authenticator provides.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Resolve the request body into a local user.
    ///
    /// `body` is `None` when the request carried no body at all.
    async fn authenticate(
        &self,
        body: Option<&[u8]>,
        store: &dyn UserStore,
        root: &str,
    ) -> Result<LocalUser, AuthError>;

    /// Whether the frontend must show an interactive login form.
    fn requires_login_page(&self) -> bool;
}

/// The active strategy, one of a closed set.
#[derive(Debug)]
pub enum Authenticator {
    Local(LocalAuthenticator),
    Directory(DirectoryAuthenticator),
}

impl Authenticator {
    /// Build the strategy named by `settings.auth_method`.
    ///
    /// # Errors
    /// Returns an error if the challenge HTTP client cannot be built.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let challenge = settings
            .challenge()
            .cloned()
            .map(ChallengeVerifier::new)
            .transpose()?;

        let authenticator = match settings.auth_method {
            AuthMethod::Local => Self::Local(LocalAuthenticator::new().with_challenge(challenge)),
            AuthMethod::Directory => {
                let client = DirectoryClient::ldap(settings.ldap.clone());
                let allocator = Arc::new(HomeDirAllocator::new(settings.create_user_dir));
                Self::Directory(
                    DirectoryAuthenticator::new(client, settings.defaults.clone(), allocator)
                        .with_challenge(challenge),
                )
            }
        };

        Ok(authenticator)
    }

    #[must_use]
    pub const fn method(&self) -> AuthMethod {
        match self {
            Self::Local(_) => AuthMethod::Local,
            Self::Directory(_) => AuthMethod::Directory,
        }
    }
}

#[async_trait]
impl AuthStrategy for Authenticator {
    async fn authenticate(
        &self,
        body: Option<&[u8]>,
        store: &dyn UserStore,
        root: &str,
    ) -> Result<LocalUser, AuthError> {
        match self {
            Self::Local(local) => local.authenticate(body, store, root).await,
            Self::Directory(directory) => directory.authenticate(body, store, root).await,
        }
    }

    fn requires_login_page(&self) -> bool {
        match self {
            Self::Local(local) => local.requires_login_page(),
            Self::Directory(directory) => directory.requires_login_page(),
        }
    }
}
