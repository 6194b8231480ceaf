//! Local password-store authentication.

use super::{
    AuthError, AuthStrategy, DenyReason,
    challenge::{self, ChallengeVerifier},
    credentials::CredentialEnvelope,
};
use crate::users::{LocalUser, StoreError, UserStore};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::instrument;

/// Checks submitted credentials against the hash stored with the local user.
#[derive(Debug, Clone, Default)]
pub struct LocalAuthenticator {
    challenge: Option<ChallengeVerifier>,
}

impl LocalAuthenticator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_challenge(mut self, challenge: Option<ChallengeVerifier>) -> Self {
        self.challenge = challenge;
        self
    }
}

#[async_trait]
impl AuthStrategy for LocalAuthenticator {
    #[instrument(skip_all, fields(method = "json"))]
    async fn authenticate(
        &self,
        body: Option<&[u8]>,
        store: &dyn UserStore,
        root: &str,
    ) -> Result<LocalUser, AuthError> {
        let credentials = CredentialEnvelope::decode(body)?;

        challenge::gate(self.challenge.as_ref(), &credentials.challenge_token).await?;

        let user = match store.get(root, &credentials.username).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Err(AuthError::denied(DenyReason::UnknownUser)),
            Err(err) => return Err(AuthError::infrastructure(err)),
        };

        if !user.check_password(credentials.password.expose_secret()) {
            return Err(AuthError::denied(DenyReason::InvalidCredentials));
        }

        Ok(user)
    }

    fn requires_login_page(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::challenge::tests::{can_bind_localhost, mount_reply, verifier_for};
    use crate::users::{MemoryUserStore, hash_password};
    use anyhow::{Result, anyhow};
    use serde_json::json;
    use wiremock::MockServer;

    fn store_with_alice() -> Result<MemoryUserStore> {
        let mut alice = LocalUser::new("alice", hash_password("correct").map_err(|e| anyhow!(e))?);
        alice.scope = "/alice".to_string();
        let bob = LocalUser::new("bob", hash_password("other").map_err(|e| anyhow!(e))?);
        Ok(MemoryUserStore::with_users([alice, bob]))
    }

    struct BrokenStore;

    #[async_trait]
    impl UserStore for BrokenStore {
        async fn get(&self, _root: &str, _username: &str) -> Result<LocalUser, StoreError> {
            Err(StoreError::Backend(anyhow!("connection reset")))
        }

        async fn save(&self, _user: &LocalUser) -> Result<(), StoreError> {
            Err(StoreError::Backend(anyhow!("connection reset")))
        }
    }

    async fn reason(
        authenticator: &LocalAuthenticator,
        store: &dyn UserStore,
        body: Option<&[u8]>,
    ) -> Option<DenyReason> {
        authenticator
            .authenticate(body, store, "/srv")
            .await
            .err()
            .and_then(|err| err.deny_reason())
    }

    #[tokio::test]
    async fn valid_credentials_resolve_matching_user() -> Result<()> {
        let store = store_with_alice()?;
        let user = LocalAuthenticator::new()
            .authenticate(
                Some(br#"{"username":"alice","password":"correct"}"#),
                &store,
                "/srv",
            )
            .await?;
        assert_eq!(user.username, "alice");
        assert_eq!(user.scope, "/alice");
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_is_denied() -> Result<()> {
        let store = store_with_alice()?;
        let authenticator = LocalAuthenticator::new();
        assert_eq!(
            reason(
                &authenticator,
                &store,
                Some(br#"{"username":"alice","password":"wrong"}"#)
            )
            .await,
            Some(DenyReason::InvalidCredentials)
        );
        // Another user's password never unlocks alice.
        assert_eq!(
            reason(
                &authenticator,
                &store,
                Some(br#"{"username":"alice","password":"other"}"#)
            )
            .await,
            Some(DenyReason::InvalidCredentials)
        );
        Ok(())
    }

    #[tokio::test]
    async fn unknown_user_is_denied() -> Result<()> {
        let store = store_with_alice()?;
        assert_eq!(
            reason(
                &LocalAuthenticator::new(),
                &store,
                Some(br#"{"username":"mallory","password":"correct"}"#)
            )
            .await,
            Some(DenyReason::UnknownUser)
        );
        Ok(())
    }

    #[tokio::test]
    async fn empty_or_missing_body_is_denied() -> Result<()> {
        let store = store_with_alice()?;
        let authenticator = LocalAuthenticator::new();
        assert_eq!(
            reason(&authenticator, &store, None).await,
            Some(DenyReason::MalformedRequest)
        );
        assert_eq!(
            reason(&authenticator, &store, Some(b"")).await,
            Some(DenyReason::MalformedRequest)
        );
        Ok(())
    }

    #[tokio::test]
    async fn store_failure_is_infrastructure() {
        let result = LocalAuthenticator::new()
            .authenticate(
                Some(br#"{"username":"alice","password":"correct"}"#),
                &BrokenStore,
                "/srv",
            )
            .await;
        assert!(matches!(result, Err(AuthError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn rejected_challenge_denies_valid_credentials() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_reply(&server, 200, json!({ "success": false })).await;

        let store = store_with_alice()?;
        let authenticator = LocalAuthenticator::new().with_challenge(Some(verifier_for(&server)?));
        assert_eq!(
            reason(
                &authenticator,
                &store,
                Some(br#"{"username":"alice","password":"correct","recaptcha":"t"}"#)
            )
            .await,
            Some(DenyReason::ChallengeRejected)
        );
        Ok(())
    }

    #[tokio::test]
    async fn failing_challenge_service_denies_valid_credentials() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_reply(&server, 503, json!({})).await;

        let store = store_with_alice()?;
        let authenticator = LocalAuthenticator::new().with_challenge(Some(verifier_for(&server)?));
        assert_eq!(
            reason(
                &authenticator,
                &store,
                Some(br#"{"username":"alice","password":"correct","recaptcha":"t"}"#)
            )
            .await,
            Some(DenyReason::ChallengeRejected)
        );
        Ok(())
    }

    #[tokio::test]
    async fn accepted_challenge_lets_credentials_through() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_reply(&server, 200, json!({ "success": true })).await;

        let store = store_with_alice()?;
        let user = LocalAuthenticator::new()
            .with_challenge(Some(verifier_for(&server)?))
            .authenticate(
                Some(br#"{"username":"alice","password":"correct","recaptcha":"t"}"#),
                &store,
                "/srv",
            )
            .await?;
        assert_eq!(user.username, "alice");
        Ok(())
    }

    #[test]
    fn requires_login_page() {
        assert!(LocalAuthenticator::new().requires_login_page());
    }
}
