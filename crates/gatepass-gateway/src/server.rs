// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use gatepass_core::GatepassError;
use gatepass_sync::{ProfileStore, StatusService, SyncService, WebhookIngestor};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Orchestrator for the active device profile, if one is configured.
    pub sync: Option<Arc<SyncService>>,
    pub status: Arc<StatusService>,
    pub webhooks: Arc<WebhookIngestor>,
    /// Encrypted profile storage. Requires a vault master key.
    pub profiles: Option<Arc<ProfileStore>>,
    pub auth: AuthConfig,
    /// Process start time for uptime calculation.
    pub started: std::time::Instant,
}

/// Bind address for the gateway.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl From<&gatepass_config::model::ServerConfig> for ServerConfig {
    fn from(config: &gatepass_config::model::ServerConfig) -> Self {
        Self {
            host: config.bind_address.clone(),
            port: config.port,
        }
    }
}

/// Assemble the router.
///
/// - GET /health and POST /v1/webhooks/events are public
/// - every other /v1 route requires the bearer token
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/v1/webhooks/events", post(handlers::post_webhook_event))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/attendees/{id}/sync", post(handlers::post_sync_attendee))
        .route("/v1/attendees/{id}/reset", post(handlers::post_reset_attendee))
        .route(
            "/v1/attendees/{id}/external",
            delete(handlers::delete_external_person),
        )
        .route(
            "/v1/attendees/{id}/sync-status",
            get(handlers::get_attendee_sync_status),
        )
        .route("/v1/sync/batch", post(handlers::post_sync_batch))
        .route("/v1/sync/pending", post(handlers::post_sync_pending))
        .route("/v1/sync/status", get(handlers::get_sync_overview))
        .route("/v1/sync/errors", get(handlers::get_sync_errors))
        .route("/v1/sync/batches/{id}", get(handlers::get_batch_detail))
        .route("/v1/profiles/{name}", get(handlers::get_profile))
        .route("/v1/profiles", put(handlers::put_profile))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the gateway until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), GatepassError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GatepassError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| GatepassError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
