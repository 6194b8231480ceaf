use crate::{
    auth::{AuthStrategy, Authenticator, CredentialEnvelope},
    users::UserStore,
};
use anyhow::Result;
use axum::{
    Extension, Json, Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
};
use std::{fmt, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod handlers;

use handlers::{health, login};

const REQUEST_ID: &str = "x-request-id";

/// Everything a request handler needs, shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub store: Arc<dyn UserStore>,
    /// Filesystem root user scopes are relative to.
    pub root: String,
    /// Deadline for one authentication attempt, outbound calls included.
    pub auth_timeout: Duration,
}

impl AppState {
    #[must_use]
    pub fn requires_login_page(&self) -> bool {
        self.authenticator.requires_login_page()
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("authenticator", &self.authenticator)
            .field("root", &self.root)
            .field("auth_timeout", &self.auth_timeout)
            .finish_non_exhaustive()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(login::login, health::health),
    components(schemas(CredentialEnvelope, login::LoginResponse, health::Health)),
    tags(
        (name = "auth", description = "Credential verification"),
        (name = "health", description = "Service status"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/login", post(login::login))
        .route("/health", get(health::health).options(health::health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
        .layer(Extension(Arc::new(state)))
}

/// Start the server
/// # Errors
/// Return error if failed to bind the port or serve
pub async fn new(port: u16, state: AppState) -> Result<()> {
    info!(
        "Authentication method: {}, root: {}",
        state.authenticator.method(),
        state.root
    );

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let path = request.uri().path();
    let method = request.method().as_str();
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    info_span!("http-request", method, path, request_id)
}
