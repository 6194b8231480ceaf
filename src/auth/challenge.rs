//! reCAPTCHA-compatible human verification.
//!
//! The token is posted form-encoded to `<host>/recaptcha/api/siteverify`; a `200`
//! answer carries `{ "success": bool }`. Any other status counts as a failed
//! verification rather than a transport error.

use super::{AuthError, DenyReason};
use crate::{APP_USER_AGENT, settings::deserialize_secret};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

const SITEVERIFY_PATH: &str = "/recaptcha/api/siteverify";
const DEFAULT_HOST: &str = "https://www.google.com";

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    pub host: String,
    /// Public site key, handed to the frontend.
    pub key: String,
    #[serde(deserialize_with = "deserialize_secret")]
    pub secret: SecretString,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            key: String::new(),
            secret: SecretString::default(),
        }
    }
}

impl ChallengeConfig {
    /// Verification is opt-in: an empty secret disables it.
    #[must_use]
    pub fn enabled(&self) -> bool {
        !self.secret.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for ChallengeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeConfig")
            .field("host", &self.host)
            .field("key", &self.key)
            .field("secret", &"***")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("challenge verification request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("invalid challenge verification response: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Clone)]
pub struct ChallengeVerifier {
    config: ChallengeConfig,
    client: Client,
}

impl ChallengeVerifier {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ChallengeConfig) -> Result<Self, ChallengeError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .map_err(ChallengeError::Transport)?;
        Ok(Self { config, client })
    }

    /// Ask the verification service whether `response` is a valid token.
    ///
    /// # Errors
    /// Returns `Transport` when the service cannot be reached and `Decode` when a `200`
    /// answer is not the expected JSON.
    #[instrument(skip_all)]
    pub async fn verify(&self, response: &str) -> Result<bool, ChallengeError> {
        let url = format!("{}{SITEVERIFY_PATH}", self.config.host.trim_end_matches('/'));
        let form = [
            ("secret", self.config.secret.expose_secret()),
            ("response", response),
        ];

        let reply = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(ChallengeError::Transport)?;

        if reply.status() != StatusCode::OK {
            debug!("Challenge verification returned {}", reply.status());
            return Ok(false);
        }

        let body: SiteVerifyResponse = reply.json().await.map_err(ChallengeError::Decode)?;

        Ok(body.success)
    }
}

/// Run the optional challenge gate shared by every strategy.
pub(super) async fn gate(verifier: Option<&ChallengeVerifier>, token: &str) -> Result<(), AuthError> {
    let Some(verifier) = verifier else {
        return Ok(());
    };

    match verifier.verify(token).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::denied(DenyReason::ChallengeRejected)),
        Err(err) => Err(AuthError::denied_with(DenyReason::ChallengeUnavailable, err)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    pub(crate) fn verifier_for(server: &MockServer) -> Result<ChallengeVerifier> {
        Ok(ChallengeVerifier::new(ChallengeConfig {
            host: server.uri(),
            key: "site-key".to_string(),
            secret: SecretString::from("s3cret"),
        })?)
    }

    pub(crate) async fn mount_reply(server: &MockServer, status: u16, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(SITEVERIFY_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn empty_secret_disables_verification() {
        assert!(!ChallengeConfig::default().enabled());
        let config = ChallengeConfig {
            secret: SecretString::from("x"),
            ..ChallengeConfig::default()
        };
        assert!(config.enabled());
    }

    #[tokio::test]
    async fn verify_posts_form_and_reads_success() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SITEVERIFY_PATH))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("secret=s3cret&response=token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(verifier_for(&server)?.verify("token").await?);
        Ok(())
    }

    #[tokio::test]
    async fn verify_reports_rejection() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_reply(&server, 200, json!({ "success": false })).await;

        assert!(!verifier_for(&server)?.verify("token").await?);
        Ok(())
    }

    #[tokio::test]
    async fn non_ok_status_is_a_failed_verification() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_reply(&server, 500, json!({ "success": true })).await;

        assert!(!verifier_for(&server)?.verify("token").await?);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SITEVERIFY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = verifier_for(&server)?.verify("token").await;
        assert!(matches!(result, Err(ChallengeError::Decode(_))));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() -> Result<()> {
        let verifier = ChallengeVerifier::new(ChallengeConfig {
            host: "http://127.0.0.1:1".to_string(),
            key: String::new(),
            secret: SecretString::from("s3cret"),
        })?;

        let result = verifier.verify("token").await;
        assert!(matches!(result, Err(ChallengeError::Transport(_))));
        Ok(())
    }

    #[tokio::test]
    async fn gate_without_verifier_passes() {
        assert!(gate(None, "").await.is_ok());
    }

    #[tokio::test]
    async fn gate_maps_failures_to_denial() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_reply(&server, 200, json!({ "success": false })).await;
        let verifier = verifier_for(&server)?;

        let err = gate(Some(&verifier), "token").await.err();
        assert_eq!(
            err.and_then(|err| err.deny_reason()),
            Some(DenyReason::ChallengeRejected)
        );

        let unreachable = ChallengeVerifier::new(ChallengeConfig {
            host: "http://127.0.0.1:1".to_string(),
            key: String::new(),
            secret: SecretString::from("s3cret"),
        })?;
        let err = gate(Some(&unreachable), "token").await.err();
        assert_eq!(
            err.and_then(|err| err.deny_reason()),
            Some(DenyReason::ChallengeUnavailable)
        );
        Ok(())
    }
}
