use crate::{
    api::AppState,
    auth::{AuthError, AuthStrategy, CredentialEnvelope},
};
use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct LoginResponse {
    pub username: String,
    pub scope: String,
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = CredentialEnvelope,
    responses (
        (status = 200, description = "Credentials accepted", body = LoginResponse),
        (status = 401, description = "Credentials rejected"),
        (status = 500, description = "Login failed"),
    ),
    tag = "auth",
)]
/// Resolve the submitted credentials into a local user.
///
/// Denials answer `401` with an empty body whatever the reason.
#[instrument(skip_all)]
pub async fn login(state: Extension<Arc<AppState>>, body: Bytes) -> Response {
    let body = (!body.is_empty()).then_some(body.as_ref());

    let attempt = state
        .authenticator
        .authenticate(body, state.store.as_ref(), &state.root);

    match timeout(state.auth_timeout, attempt).await {
        Ok(Ok(user)) => {
            info!("Login succeeded for {}", user.username);

            (
                StatusCode::OK,
                Json(LoginResponse {
                    username: user.username,
                    scope: user.scope,
                }),
            )
                .into_response()
        }

        Ok(Err(AuthError::PermissionDenied { reason, source })) => {
            match source {
                Some(source) => warn!(%reason, "Login denied: {source:#}"),
                None => warn!(%reason, "Login denied"),
            }

            StatusCode::UNAUTHORIZED.into_response()
        }

        Ok(Err(AuthError::Infrastructure(err))) => {
            error!("Login failed: {err:#}");

            (StatusCode::INTERNAL_SERVER_ERROR, "Login failed").into_response()
        }

        Err(_) => {
            error!("Login timed out after {:?}", state.auth_timeout);

            (StatusCode::INTERNAL_SERVER_ERROR, "Login failed").into_response()
        }
    }
}
