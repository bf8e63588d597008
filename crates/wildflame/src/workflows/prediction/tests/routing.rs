use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tower::ServiceExt;

use crate::workflows::prediction::registry::{SessionLimits, SessionRegistry};
use crate::workflows::prediction::router::{predict_handler, prediction_router};

fn put_feature(session_id: &str, feature: &str, value: &str) -> Request<Body> {
    Request::put(format!("/api/v1/sessions/{session_id}/features/{feature}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({ "value": value })).expect("serializes"),
        ))
        .expect("request builds")
}

fn post(uri: String) -> Request<Body> {
    Request::post(uri).body(Body::empty()).expect("request builds")
}

fn get(uri: String) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request builds")
}

#[tokio::test]
async fn full_session_cycle_over_http() {
    let registry = registry();
    let router = prediction_router(registry.clone());

    let response = router
        .clone()
        .oneshot(post("/api/v1/sessions".to_string()))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    let session_id = created["id"].as_str().expect("id present").to_string();
    assert_eq!(created["phase"], "idle");
    assert!(created["snapshot"].is_null());

    for (name, raw) in moderate_inputs() {
        let response = router
            .clone()
            .oneshot(put_feature(&session_id, name, raw))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK, "{name}");
    }

    let response = router
        .clone()
        .oneshot(post(format!("/api/v1/sessions/{session_id}/predict")))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot = json_body(response).await;
    assert_eq!(snapshot["label"], "fire");
    assert_eq!(snapshot["severity"], "Low");
    assert_eq!(snapshot["location"]["place_name"], "Sidi Bel Abbès, Algeria");
    assert_eq!(snapshot["location"]["coordinates"]["latitude"], 20.5937);

    let response = router
        .clone()
        .oneshot(post(format!("/api/v1/sessions/{session_id}/reset")))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let view = json_body(response).await;
    assert_eq!(view["phase"], "idle");
    assert!(view["snapshot"].is_null());
    assert_eq!(view["inputs"]["FFMC"], "");
}

#[tokio::test]
async fn set_feature_reports_invalid_values() {
    let registry = registry();
    let handle = registry.create().expect("room for session");
    let router = prediction_router(registry);

    let response = router
        .oneshot(put_feature(&handle.id.0, "year", "20x2"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["outcome"]["status"], "invalid");
    assert_eq!(body["outcome"]["reason"], "not_digit_string");
    assert_eq!(handle.lock().inputs().get("year"), Some("20x2"));
}

#[tokio::test]
async fn set_feature_rejects_unknown_names() {
    let registry = registry();
    let handle = registry.create().expect("room for session");
    let router = prediction_router(registry);

    let response = router
        .oneshot(put_feature(&handle.id.0, "Rain", "0"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn predict_handler_returns_missing_fields() {
    let registry = registry();
    let handle = registry.create().expect("room for session");
    handle
        .lock()
        .set_feature("FFMC", "91")
        .expect("FFMC in schema");

    let response = predict_handler(State(registry.clone()), Path(handle.id.0.clone())).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Please fill in all values before predicting.");
    assert_eq!(body["missing"].as_array().expect("missing list").len(), 9);
    assert!(handle.lock().read_snapshot().is_none());
    assert_eq!(registry.classifier().calls(), 0);
}

#[tokio::test]
async fn predict_handler_returns_invalid_fields() {
    let registry = registry();
    let handle = registry.create().expect("room for session");
    {
        let mut session = handle.lock();
        fill(&mut *session, &moderate_inputs());
        session.set_feature("wind", "gusty").expect("wind in schema");
    }

    let response = predict_handler(State(registry), Path(handle.id.0.clone())).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["fields"][0]["feature"], "wind");
    assert_eq!(
        body["fields"][0]["message"],
        "Please enter a valid number for wind"
    );
}

#[tokio::test]
async fn unknown_sessions_are_not_found() {
    let router = prediction_router(registry());

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/sessions/session-999999")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .oneshot(post("/api/v1/sessions/session-999999/predict".to_string()))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_sessions_disappear() {
    let registry = registry();
    let handle = registry.create().expect("room for session");
    let router = prediction_router(registry.clone());

    let response = router
        .oneshot(
            Request::delete(format!("/api/v1/sessions/{}", handle.id))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn model_metadata_routes_list_schema_and_importances() {
    let router = prediction_router(registry());

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/model/features")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    let body = json_body(response).await;
    let features = body["features"].as_array().expect("feature list");
    assert_eq!(features.len(), WEATHER_FEATURES.len());
    assert_eq!(features[0]["name"], "day");
    assert_eq!(features[0]["kind"], "temporal");
    assert_eq!(features[3]["kind"], "continuous");
    assert!(features[0].get("description").is_none());
    assert_eq!(features[6]["name"], "FFMC");
    assert_eq!(
        features[6]["description"]["title"],
        "Fine Fuel Moisture Code"
    );
    assert_eq!(
        features[9]["description"]["range"],
        "No strict upper limit (usually 0 to 50+)"
    );

    let response = router
        .oneshot(
            Request::get("/api/v1/model/importances")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    let body = json_body(response).await;
    assert_eq!(body["importances"][0]["feature"], "FFMC");
}

// `#[tokio::test]` runs on a single-threaded runtime, so any handler that blocks
// on a session lock from the async worker freezes every other task.
#[tokio::test]
async fn slow_lookup_does_not_stall_the_runtime() {
    let entered = Arc::new(Notify::new());
    let registry = Arc::new(SessionRegistry::new(
        weather_schema(),
        Arc::new(FfmcClassifier::default()),
        Arc::new(SlowPlace {
            entered: entered.clone(),
            delay: Duration::from_millis(800),
        }),
    ));
    let handle = registry.create().expect("room for session");
    fill(&mut *handle.lock(), &moderate_inputs());
    let session_id = handle.id.0.clone();
    let router = prediction_router(registry);

    let predicting = tokio::spawn(
        router
            .clone()
            .oneshot(post(format!("/api/v1/sessions/{session_id}/predict"))),
    );
    entered.notified().await;

    let reading = tokio::spawn(
        router
            .clone()
            .oneshot(get(format!("/api/v1/sessions/{session_id}"))),
    );
    let started = Instant::now();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(
        started.elapsed() < Duration::from_millis(400),
        "timer starved for {:?} while a lookup held the session",
        started.elapsed()
    );

    let predicted = predicting
        .await
        .expect("predict task joins")
        .expect("router responds");
    assert_eq!(predicted.status(), StatusCode::OK);
    let snapshot = json_body(predicted).await;
    assert_eq!(snapshot["location"]["place_name"], "Tlemcen, Algeria");

    let read = reading
        .await
        .expect("read task joins")
        .expect("router responds");
    assert_eq!(read.status(), StatusCode::OK);
    assert_eq!(json_body(read).await["phase"], "predicted");
}

#[tokio::test]
async fn create_reports_a_full_registry() {
    let registry = Arc::new(
        SessionRegistry::new(
            weather_schema(),
            Arc::new(FfmcClassifier::default()),
            Arc::new(FixedPlace("Oran, Algeria")),
        )
        .with_limits(SessionLimits {
            max_sessions: 1,
            idle_timeout: SessionLimits::DEFAULT_IDLE_TIMEOUT,
        }),
    );
    let router = prediction_router(registry.clone());

    let response = router
        .clone()
        .oneshot(post("/api/v1/sessions".to_string()))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .oneshot(post("/api/v1/sessions".to_string()))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["error"], "session limit of 1 reached; try again later");
    assert_eq!(registry.len(), 1);
}
