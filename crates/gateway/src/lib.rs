//! HTTP API gateway for pmrelay.
//!
//! Exposes the relay endpoints the front end talks to:
//!
//! - `POST /sync`          - Replace the cached readables/actions
//! - `POST /chat`          - Send a message, get text or a tool call
//! - `POST /chat-stream`   - Send a message, get an SSE stream of events
//! - `POST /action-result` - Acknowledge the outcome of an executed action
//! - `GET  /state`         - Inspect the current snapshot
//! - `GET  /health`        - Liveness probe
//!
//! Built on Axum. Cross-origin access is unrestricted; there is no
//! authentication.

pub mod api;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{Router, extract::State, response::Json, routing::get};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use pmrelay_assistant::Assistant;
use pmrelay_core::state::StateCache;

/// Shared application state for the gateway.
///
/// The state cache lives here rather than in a global; every handler that
/// needs the catalogs takes a snapshot from it at the moment it runs.
pub struct GatewayState {
    pub cache: StateCache,
    pub assistant: Assistant,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl GatewayState {
    pub fn new(assistant: Assistant) -> Self {
        Self {
            cache: StateCache::new(),
            assistant,
            start_time: chrono::Utc::now(),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - Permissive CORS (any origin, method and header)
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(api::relay_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: pmrelay_config::AppConfig) -> pmrelay_core::Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = pmrelay_providers::build_from_config(&config)?;
    info!(
        api_url = %provider.api_url(),
        model = %config.provider.model,
        "Provider configured"
    );

    let assistant = Assistant::from_config(Arc::new(provider), &config.provider);
    let state = Arc::new(GatewayState::new(assistant));
    let app = build_router(state, config.gateway.body_limit_bytes);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}
