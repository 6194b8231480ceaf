//! Directory-service authentication with first-login provisioning.
//!
//! The directory decides who the caller is; the local store decides what they may
//! touch. An existing local record is returned untouched: group membership is only
//! read at first login and never synced back into an existing record.

mod client;
mod ldap;
#[cfg(test)]
pub(crate) mod testing;

pub use client::{
    DirectoryClient, DirectoryConnector, DirectoryEntry, DirectoryError, DirectoryFailure,
    DirectoryIdentity, DirectorySession,
};
pub use ldap::LdapConnector;

use super::{
    AuthError, AuthStrategy, DenyReason,
    challenge::{self, ChallengeVerifier},
    credentials::CredentialEnvelope,
};
use crate::{
    settings::UserDefaults,
    users::{LocalUser, ScopeAllocator, StoreError, UserStore, hash_password},
};
use anyhow::anyhow;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::Arc};
use tracing::instrument;

pub struct DirectoryAuthenticator {
    client: DirectoryClient,
    challenge: Option<ChallengeVerifier>,
    defaults: UserDefaults,
    allocator: Arc<dyn ScopeAllocator>,
}

impl DirectoryAuthenticator {
    #[must_use]
    pub fn new(
        client: DirectoryClient,
        defaults: UserDefaults,
        allocator: Arc<dyn ScopeAllocator>,
    ) -> Self {
        Self {
            client,
            challenge: None,
            defaults,
            allocator,
        }
    }

    #[must_use]
    pub fn with_challenge(mut self, challenge: Option<ChallengeVerifier>) -> Self {
        self.challenge = challenge;
        self
    }

    /// Create the local record for an identity the directory just vouched for.
    ///
    /// The scope is allocated before anything is written, so a failed allocation
    /// leaves the store untouched.
    async fn provision(
        &self,
        identity: &DirectoryIdentity,
        secret: &SecretString,
        store: &dyn UserStore,
        root: &str,
    ) -> Result<LocalUser, AuthError> {
        let password = hash_password(secret.expose_secret())
            .map_err(|err| AuthError::infrastructure(anyhow!("failed to hash password: {err}")))?;

        let mut user = LocalUser::new(identity.username.clone(), password);
        self.defaults.apply(&mut user);

        user.scope = self
            .allocator
            .allocate_home(&user.username, &user.scope, root)
            .await
            .map_err(AuthError::Infrastructure)?;

        store.save(&user).await.map_err(AuthError::infrastructure)?;

        Ok(user)
    }
}

#[async_trait]
impl AuthStrategy for DirectoryAuthenticator {
    #[instrument(skip_all, fields(method = "ldap"))]
    async fn authenticate(
        &self,
        body: Option<&[u8]>,
        store: &dyn UserStore,
        root: &str,
    ) -> Result<LocalUser, AuthError> {
        let credentials = CredentialEnvelope::decode(body)?;

        challenge::gate(self.challenge.as_ref(), &credentials.challenge_token).await?;

        // Directory failure reasons stay internal; the caller only learns "denied".
        let identity = self
            .client
            .resolve(&credentials.username, credentials.password.expose_secret())
            .await
            .map_err(|err| AuthError::denied_with(DenyReason::Directory(err.kind()), err))?;

        match store.get(root, &identity.username).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound) => {
                self.provision(&identity, &credentials.password, store, root)
                    .await
            }
            Err(err) => Err(AuthError::infrastructure(err)),
        }
    }

    fn requires_login_page(&self) -> bool {
        true
    }
}

impl fmt::Debug for DirectoryAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryAuthenticator")
            .field("client", &self.client)
            .field("challenge", &self.challenge)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
