use crate::error::AppError;
use crate::services::metrics::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

/// Liveness: the process is up.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": "invoice-maker" }))
}

/// Readiness: the database answers.
pub async fn ready(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.db.health_check().await?;
    Ok(Json(json!({ "status": "ready" })))
}

/// Prometheus text exposition.
pub async fn metrics() -> impl IntoResponse {
    get_metrics()
}
