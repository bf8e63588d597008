use crate::infra::{AppState, Workflow};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::sync::Arc;
use wildflame::error::AppError;
use wildflame::workflows::history::HistoricalTrends;
use wildflame::workflows::prediction::prediction_router;

pub(crate) fn with_service_routes(registry: Arc<Workflow>) -> Router {
    prediction_router(registry)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/history/trends", get(trends_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Re-reads the records export on every call so a refreshed file is picked up.
pub(crate) async fn trends_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<HistoricalTrends>, AppError> {
    let path = state.history_csv.clone();
    let trends = tokio::task::spawn_blocking(move || HistoricalTrends::from_path(path)).await??;
    Ok(Json(trends))
}
