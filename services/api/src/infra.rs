use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use wildflame::config::AppConfig;
use wildflame::error::AppError;
use wildflame::workflows::prediction::{
    ConfiguredGeocoder, FeatureSchema, ForestClassifier, SessionRegistry,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) history_csv: PathBuf,
}

pub(crate) type Workflow = SessionRegistry<ForestClassifier, ConfiguredGeocoder>;

/// Loads the schema and model artifacts and builds the configured geocoder.
///
/// Blocking: the Nominatim client owns its own runtime, so call this from a plain
/// thread or `spawn_blocking`.
pub(crate) fn load_workflow(config: &AppConfig) -> Result<Workflow, AppError> {
    let schema = Arc::new(FeatureSchema::from_path(&config.artifacts.schema_path)?);
    let classifier = ForestClassifier::from_path(&config.artifacts.model_path, &schema)?;
    let geocoder = ConfiguredGeocoder::from_config(&config.geocoder)?;

    info!(
        features = schema.len(),
        trees = classifier.tree_count(),
        geocoder = ?config.geocoder.mode,
        max_sessions = config.sessions.max_sessions,
        idle_secs = config.sessions.idle_timeout.as_secs(),
        "prediction artifacts loaded"
    );

    Ok(
        SessionRegistry::new(schema, Arc::new(classifier), Arc::new(geocoder))
            .with_limits(config.sessions),
    )
}
