//! Login request body.

use super::{AuthError, DenyReason};
use crate::settings::deserialize_secret;
use secrecy::SecretString;
use serde::Deserialize;
use utoipa::ToSchema;

/// Credentials submitted by the login form.
///
/// Missing fields decode as empty strings; only an absent or undecodable body is rejected
/// at this stage.
#[derive(ToSchema, Deserialize, Debug)]
pub struct CredentialEnvelope {
    #[serde(default)]
    pub username: String,
    #[serde(default, deserialize_with = "deserialize_secret")]
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
    /// Challenge-response token, only checked when a challenge secret is configured.
    #[serde(default, rename = "recaptcha")]
    pub challenge_token: String,
}

impl CredentialEnvelope {
    /// Decode a request body.
    ///
    /// # Errors
    /// Returns `PermissionDenied(MalformedRequest)` when `body` is absent or not a JSON
    /// object of the expected shape.
    pub fn decode(body: Option<&[u8]>) -> Result<Self, AuthError> {
        let Some(body) = body else {
            return Err(AuthError::denied(DenyReason::MalformedRequest));
        };

        serde_json::from_slice(body)
            .map_err(|err| AuthError::denied_with(DenyReason::MalformedRequest, err))
    }
}
