//! REST control surface
//!
//! Two endpoints:
//!
//! - `POST /api/v1/gdelt/process`: manual trigger; spawns a coordinator
//!   tick and returns `202 Accepted` immediately. Failures are observable
//!   only in the logs, matching the scheduled path.
//! - `GET /health`: liveness probe; pings Redis.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use redis::aio::ConnectionManager;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::ingest::Coordinator;

/// Shared state for the REST handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub redis: ConnectionManager,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/gdelt/process", post(trigger_process))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Manual trigger: start a tick in the background, acknowledge immediately.
async fn trigger_process(State(state): State<AppState>) -> Response {
    info!("Manual archive processing requested");

    let coordinator = Arc::clone(&state.coordinator);
    tokio::spawn(async move {
        match coordinator.tick().await {
            Ok(summary) => info!(
                processed = summary.processed,
                succeeded = summary.succeeded,
                "Manual archive check completed"
            ),
            Err(e) => error!(error = %e, "Manual archive check failed"),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "accepted",
            "message": "GDELT archive processing started"
        })),
    )
        .into_response()
}

/// Liveness probe: verifies the key-value store responds.
async fn health_check(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let mut conn = state.redis.clone();
    match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "redis": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            error!(error = %e, "Redis health check failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
