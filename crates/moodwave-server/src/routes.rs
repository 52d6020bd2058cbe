//! HTTP routes and handlers

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::AppError;
use crate::service;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/v1/stats", get(stats))
        .route("/v1/users/:user/sessions", post(record_session))
        .route("/v1/users/:user/history", get(history))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.metrics.snapshot();
    Json(json!({
        "metrics": snapshot,
        "avg_latency_us": snapshot.avg_latency_us(),
        "failure_rate": snapshot.failure_rate(),
        "classifiers": state.engine.ensemble().member_names(),
        "voting": state.engine.ensemble().voting(),
    }))
}

/// Body is the raw headset capture: `{timestamp: [10 values], ...}`
async fn record_session(
    State(state): State<AppState>,
    Path(user): Path<String>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    validate_user(&user)?;
    debug!(user = %user, bytes = body.len(), "Received recording");

    let report = service::run_inference_cycle(&state, &user, body, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn history(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    validate_user(&user)?;
    let summary = service::fetch_history(&state, &user).await?;
    Ok(Json(summary))
}

fn validate_user(user: &str) -> Result<(), AppError> {
    if user.is_empty() || user.len() > 128 || user.chars().any(char::is_control) {
        return Err(AppError::InvalidRequest(
            "user name must be 1-128 printable characters".to_string(),
        ));
    }
    Ok(())
}

async fn fallback() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "kind": "not_found",
                "message": "Endpoint not found",
            }
        })),
    )
}
