use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::to_bytes;
use axum::response::Response;
use serde_json::Value;
use tokio::sync::Notify;

use crate::workflows::prediction::classifier::FireClassifier;
use crate::workflows::prediction::location::{Coordinates, LookupError, ReverseGeocoder};
use crate::workflows::prediction::registry::SessionRegistry;
use crate::workflows::prediction::schema::FeatureSchema;
use crate::workflows::prediction::session::PredictionSession;
use crate::workflows::prediction::vector::FeatureVector;

pub(super) const WEATHER_FEATURES: [&str; 10] = [
    "day", "month", "year", "temp", "RH", "wind", "FFMC", "DMC", "DC", "ISI",
];

pub(super) fn weather_schema() -> Arc<FeatureSchema> {
    Arc::new(FeatureSchema::new(WEATHER_FEATURES).expect("weather schema builds"))
}

pub(super) fn located_schema() -> Arc<FeatureSchema> {
    let names = WEATHER_FEATURES
        .iter()
        .copied()
        .chain(["latitude", "longitude"]);
    Arc::new(FeatureSchema::new(names).expect("located schema builds"))
}

/// Scenario inputs whose severity score works out to 72.
pub(super) fn moderate_inputs() -> Vec<(&'static str, &'static str)> {
    vec![
        ("day", "14"),
        ("month", "8"),
        ("year", "2012"),
        ("temp", "25"),
        ("RH", "40"),
        ("wind", "15"),
        ("FFMC", "90"),
        ("DMC", "60"),
        ("DC", "200"),
        ("ISI", "10"),
    ]
}

/// Same conditions scaled up until the score passes 200.
pub(super) fn extreme_inputs() -> Vec<(&'static str, &'static str)> {
    moderate_inputs()
        .into_iter()
        .map(|(name, raw)| match name {
            "FFMC" => (name, "400"),
            "DMC" => (name, "300"),
            "DC" => (name, "600"),
            _ => (name, raw),
        })
        .collect()
}

pub(super) fn fill<C, G>(session: &mut PredictionSession<C, G>, values: &[(&str, &str)])
where
    C: FireClassifier,
    G: ReverseGeocoder,
{
    for (name, raw) in values {
        session.set_feature(name, *raw).expect("feature in schema");
    }
}

/// Returns the same label for every vector.
pub(super) struct FixedLabel(pub(super) &'static str);

impl FireClassifier for FixedLabel {
    fn predict(&self, _vector: &FeatureVector) -> String {
        self.0.to_string()
    }
}

/// Labels by FFMC alone and counts invocations.
#[derive(Default)]
pub(super) struct FfmcClassifier {
    calls: Mutex<usize>,
}

impl FfmcClassifier {
    pub(super) fn calls(&self) -> usize {
        *self.calls.lock().expect("classifier mutex poisoned")
    }
}

impl FireClassifier for FfmcClassifier {
    fn predict(&self, vector: &FeatureVector) -> String {
        *self.calls.lock().expect("classifier mutex poisoned") += 1;
        if vector.number("FFMC").unwrap_or(0.0) > 80.0 {
            "fire".to_string()
        } else {
            "not fire".to_string()
        }
    }

    fn feature_importances(&self) -> Vec<(String, f64)> {
        vec![("FFMC".to_string(), 1.0)]
    }
}

pub(super) struct FixedPlace(pub(super) &'static str);

impl ReverseGeocoder for FixedPlace {
    fn reverse_lookup(&self, _coordinates: Coordinates) -> Result<String, LookupError> {
        Ok(self.0.to_string())
    }
}

/// Signals when a lookup starts, then holds the calling thread like a slow
/// network round trip.
pub(super) struct SlowPlace {
    pub(super) entered: Arc<Notify>,
    pub(super) delay: Duration,
}

impl ReverseGeocoder for SlowPlace {
    fn reverse_lookup(&self, _coordinates: Coordinates) -> Result<String, LookupError> {
        self.entered.notify_one();
        std::thread::sleep(self.delay);
        Ok("Tlemcen, Algeria".to_string())
    }
}

/// Simulates a geocoder that times out, remembering what it was asked.
#[derive(Default)]
pub(super) struct TimedOutGeocoder {
    requests: Mutex<Vec<Coordinates>>,
}

impl TimedOutGeocoder {
    pub(super) fn requests(&self) -> Vec<Coordinates> {
        self.requests
            .lock()
            .expect("geocoder mutex poisoned")
            .clone()
    }
}

impl ReverseGeocoder for TimedOutGeocoder {
    fn reverse_lookup(&self, coordinates: Coordinates) -> Result<String, LookupError> {
        self.requests
            .lock()
            .expect("geocoder mutex poisoned")
            .push(coordinates);
        Err(LookupError::Transport("operation timed out".to_string()))
    }
}

pub(super) fn registry() -> Arc<SessionRegistry<FfmcClassifier, FixedPlace>> {
    Arc::new(SessionRegistry::new(
        weather_schema(),
        Arc::new(FfmcClassifier::default()),
        Arc::new(FixedPlace("Sidi Bel Abbès, Algeria")),
    ))
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is json")
}
