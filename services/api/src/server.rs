use crate::cli::ServeArgs;
use crate::infra::{load_workflow, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use wildflame::config::AppConfig;
use wildflame::error::AppError;
use wildflame::telemetry::{self, LogSink};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, LogSink::Stdout)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        history_csv: config.artifacts.history_csv.clone(),
    };

    let workflow_config = config.clone();
    let registry = Arc::new(
        tokio::task::spawn_blocking(move || load_workflow(&workflow_config)).await??,
    );

    let app = with_service_routes(registry.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "wild flame watcher ready");

    let served = axum::serve(listener, app).await;
    // The blocking geocoder client cannot be dropped on an async worker.
    tokio::task::spawn_blocking(move || drop(registry)).await?;
    served?;
    Ok(())
}
