use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::classifier::FireClassifier;
use super::location::ReverseGeocoder;
use super::registry::{SessionHandle, SessionId, SessionRegistry};
use super::validation::PredictionBlocked;

/// Body for `PUT /api/v1/sessions/:session_id/features/:feature`.
#[derive(Debug, Deserialize)]
pub struct FeatureInput {
    #[serde(default)]
    pub value: String,
}

/// Router builder exposing the session workflow and model metadata.
pub fn prediction_router<C, G>(registry: Arc<SessionRegistry<C, G>>) -> Router
where
    C: FireClassifier + 'static,
    G: ReverseGeocoder + 'static,
{
    Router::new()
        .route("/api/v1/sessions", post(create_session_handler::<C, G>))
        .route(
            "/api/v1/sessions/:session_id",
            get(session_handler::<C, G>).delete(delete_session_handler::<C, G>),
        )
        .route(
            "/api/v1/sessions/:session_id/features/:feature",
            put(set_feature_handler::<C, G>),
        )
        .route(
            "/api/v1/sessions/:session_id/predict",
            post(predict_handler::<C, G>),
        )
        .route(
            "/api/v1/sessions/:session_id/reset",
            post(reset_handler::<C, G>),
        )
        .route("/api/v1/model/features", get(features_handler::<C, G>))
        .route("/api/v1/model/importances", get(importances_handler::<C, G>))
        .with_state(registry)
}

fn session_not_found(session_id: &str) -> Response {
    let payload = json!({
        "error": format!("session '{session_id}' not found"),
    });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

fn blocked_response(blocked: &PredictionBlocked) -> Response {
    let payload = match blocked {
        PredictionBlocked::Incomplete { missing } => json!({
            "error": blocked.to_string(),
            "missing": missing,
        }),
        PredictionBlocked::Invalid { fields } => json!({
            "error": blocked.to_string(),
            "fields": fields,
        }),
    };
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

/// Runs `work` against the session on a blocking worker. Session locks may be held
/// across a geocoder round trip, so no async worker waits on one.
async fn on_session<C, G, T, F>(
    handle: SessionHandle<C, G>,
    work: F,
) -> Result<T, Response>
where
    C: FireClassifier + 'static,
    G: ReverseGeocoder + 'static,
    T: Send + 'static,
    F: FnOnce(&SessionHandle<C, G>) -> T + Send + 'static,
{
    let session_id = handle.id.clone();
    tokio::task::spawn_blocking(move || work(&handle))
        .await
        .map_err(|error| {
            tracing::error!(session = %session_id, %error, "session worker failed");
            let payload = json!({ "error": "session worker failed" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        })
}

pub(crate) async fn create_session_handler<C, G>(
    State(registry): State<Arc<SessionRegistry<C, G>>>,
) -> Response
where
    C: FireClassifier + 'static,
    G: ReverseGeocoder + 'static,
{
    let handle = match registry.create() {
        Ok(handle) => handle,
        Err(full) => {
            let payload = json!({ "error": full.to_string() });
            return (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response();
        }
    };

    match on_session(handle, SessionHandle::<C, G>::view).await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn session_handler<C, G>(
    State(registry): State<Arc<SessionRegistry<C, G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: FireClassifier + 'static,
    G: ReverseGeocoder + 'static,
{
    let Some(handle) = registry.get(&SessionId(session_id.clone())) else {
        return session_not_found(&session_id);
    };

    match on_session(handle, SessionHandle::<C, G>::view).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn delete_session_handler<C, G>(
    State(registry): State<Arc<SessionRegistry<C, G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: FireClassifier + 'static,
    G: ReverseGeocoder + 'static,
{
    if registry.remove(&SessionId(session_id.clone())) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        session_not_found(&session_id)
    }
}

pub(crate) async fn set_feature_handler<C, G>(
    State(registry): State<Arc<SessionRegistry<C, G>>>,
    Path((session_id, feature)): Path<(String, String)>,
    Json(input): Json<FeatureInput>,
) -> Response
where
    C: FireClassifier + 'static,
    G: ReverseGeocoder + 'static,
{
    let Some(handle) = registry.get(&SessionId(session_id.clone())) else {
        return session_not_found(&session_id);
    };

    let name = feature.clone();
    let raw = input.value.clone();
    let result = match on_session(handle, move |handle| {
        let outcome = handle.lock().set_feature(&name, raw);
        outcome
    })
    .await
    {
        Ok(result) => result,
        Err(response) => return response,
    };

    match result {
        Ok(outcome) => {
            let payload = json!({
                "feature": feature,
                "value": input.value,
                "outcome": outcome,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn predict_handler<C, G>(
    State(registry): State<Arc<SessionRegistry<C, G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: FireClassifier + 'static,
    G: ReverseGeocoder + 'static,
{
    let Some(handle) = registry.get(&SessionId(session_id.clone())) else {
        return session_not_found(&session_id);
    };

    let outcome = on_session(handle, |handle| {
        let mut session = handle.lock();
        let outcome = session.trigger_predict().cloned();
        outcome
    })
    .await;

    match outcome {
        Ok(Ok(snapshot)) => (StatusCode::OK, Json(snapshot)).into_response(),
        Ok(Err(blocked)) => blocked_response(&blocked),
        Err(response) => response,
    }
}

pub(crate) async fn reset_handler<C, G>(
    State(registry): State<Arc<SessionRegistry<C, G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: FireClassifier + 'static,
    G: ReverseGeocoder + 'static,
{
    let Some(handle) = registry.get(&SessionId(session_id.clone())) else {
        return session_not_found(&session_id);
    };

    let reset = on_session(handle, |handle| {
        handle.lock().trigger_reset();
        handle.view()
    })
    .await;

    match reset {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn features_handler<C, G>(
    State(registry): State<Arc<SessionRegistry<C, G>>>,
) -> Response
where
    C: FireClassifier + 'static,
    G: ReverseGeocoder + 'static,
{
    let payload = json!({ "features": registry.schema().features() });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn importances_handler<C, G>(
    State(registry): State<Arc<SessionRegistry<C, G>>>,
) -> Response
where
    C: FireClassifier + 'static,
    G: ReverseGeocoder + 'static,
{
    let importances: Vec<serde_json::Value> = registry
        .classifier()
        .feature_importances()
        .into_iter()
        .map(|(feature, importance)| json!({ "feature": feature, "importance": importance }))
        .collect();
    (StatusCode::OK, Json(json!({ "importances": importances }))).into_response()
}
