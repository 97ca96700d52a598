//! Web server wiring for the operator WebSocket channel.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use fleet_orchestrator::OrchestratorHandle;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::websocket::websocket_handler;

pub struct AppState {
    pub orchestrator: OrchestratorHandle,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket_handler))
        .layer(cors)
        .with_state(state)
}

/// Runs the operator WebSocket server until the process is signaled to
/// shut down. `orchestrator` is moved in; the caller keeps whatever handle
/// it needs (e.g. for the MQTT bridge) via a clone taken before calling.
pub async fn run_server(config: ServerConfig, orchestrator: OrchestratorHandle) -> anyhow::Result<()> {
    let state = Arc::new(AppState { orchestrator });
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(port = config.port, "operator websocket server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
