//! HTTP routes.
//!
//! | Method | Path             | Success                                         |
//! |--------|------------------|-------------------------------------------------|
//! | GET    | `/health`        | `{"status":"ok"}`                               |
//! | POST   | `/sync`          | `{"status":"Sync completed"}`                   |
//! | GET    | `/search?q=`     | `["file name", ...]`                            |
//! | POST   | `/drive-webhook` | `{"status":"ok"}`                               |
//! | GET    | `/drive-webhook` | `{"message":"Webhook endpoint is active."}`     |
//!
//! Failures answer with `{"detail": "..."}`.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use bridge_traits::index::IndexPort;
use core_runtime::logging::redact_if_sensitive;
use core_sync::SyncCoordinator;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

type ApiResponse = (StatusCode, Json<Value>);

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SyncCoordinator>,
    pub index: Arc<dyn IndexPort>,
    pub webhook_sync_timeout: Duration,
}

/// Build the router, nested under `prefix` when one is given
pub fn router(state: AppState, prefix: Option<&str>) -> Router {
    let routes = Router::new()
        .route("/health", get(health))
        .route("/sync", post(trigger_sync))
        .route("/search", get(search))
        .route("/drive-webhook", post(drive_webhook).get(validate_webhook))
        .with_state(state);

    let app = match prefix.map(|p| p.trim_matches('/')) {
        Some(p) if !p.is_empty() => Router::new().nest(&format!("/{}", p), routes),
        _ => routes,
    };

    app.layer(TraceLayer::new_for_http())
}

fn detail(status: StatusCode, message: &str) -> ApiResponse {
    (status, Json(json!({ "detail": message })))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[instrument(skip(state))]
async fn trigger_sync(State(state): State<AppState>) -> ApiResponse {
    match state.coordinator.run_sync().await {
        Ok(report) => {
            info!("Sync triggered over HTTP completed: {}", report);
            (StatusCode::OK, Json(json!({ "status": "Sync completed" })))
        }
        Err(e) => {
            error!("Sync failed: {}", e);
            detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Sync failed due to server error.",
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[instrument(skip(state))]
async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResponse {
    let query = match params.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q,
        _ => {
            return detail(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Query parameter 'q' is required and must not be empty.",
            )
        }
    };

    match state.index.search(query).await {
        Ok(hits) => {
            let names: Vec<String> = hits.into_iter().map(|hit| hit.file_name).collect();
            (StatusCode::OK, Json(json!(names)))
        }
        Err(e) => {
            error!("Search failed: {}", e);
            detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Search failed due to server error.",
            )
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

#[instrument(skip_all)]
async fn drive_webhook(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    info!(
        resource_state = header(&headers, "x-goog-resource-state"),
        changed = header(&headers, "x-goog-changed"),
        channel_id = header(&headers, "x-goog-channel-id"),
        message_number = header(&headers, "x-goog-message-number"),
        channel_token = %redact_if_sensitive("channel_token", header(&headers, "x-goog-channel-token")),
        "Google Drive notification received"
    );

    match state
        .coordinator
        .run_sync_with_timeout(state.webhook_sync_timeout)
        .await
    {
        Ok(report) => {
            info!("Webhook sync completed: {}", report);
            (StatusCode::OK, Json(json!({ "status": "ok" })))
        }
        Err(e) => {
            error!("Webhook sync failed: {}", e);
            detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error during sync.",
            )
        }
    }
}

async fn validate_webhook() -> Json<Value> {
    Json(json!({ "message": "Webhook endpoint is active." }))
}
