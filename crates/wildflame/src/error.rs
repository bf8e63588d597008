use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::history::HistoryError;
use crate::workflows::prediction::{ModelError, RegistryFull, SchemaError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Schema(SchemaError),
    Model(ModelError),
    Geocoder(reqwest::Error),
    History(HistoryError),
    Sessions(RegistryFull),
    Worker(tokio::task::JoinError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Schema(err) => write!(f, "error loading feature columns: {}", err),
            AppError::Model(err) => write!(f, "error loading model: {}", err),
            AppError::Geocoder(err) => write!(f, "geocoder setup error: {}", err),
            AppError::History(err) => write!(f, "error loading dataset: {}", err),
            AppError::Sessions(err) => write!(f, "session error: {}", err),
            AppError::Worker(err) => write!(f, "worker error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Schema(err) => Some(err),
            AppError::Model(err) => Some(err),
            AppError::Geocoder(err) => Some(err),
            AppError::History(err) => Some(err),
            AppError::Sessions(err) => Some(err),
            AppError::Worker(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::History(_) | AppError::Sessions(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Schema(_)
            | AppError::Model(_)
            | AppError::Geocoder(_)
            | AppError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SchemaError> for AppError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<ModelError> for AppError {
    fn from(value: ModelError) -> Self {
        Self::Model(value)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        Self::Geocoder(value)
    }
}

impl From<HistoryError> for AppError {
    fn from(value: HistoryError) -> Self {
        Self::History(value)
    }
}

impl From<RegistryFull> for AppError {
    fn from(value: RegistryFull) -> Self {
        Self::Sessions(value)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Worker(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_errors_map_to_service_unavailable() {
        let error = AppError::from(HistoryError::Io {
            path: "data/missing.csv".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        });
        assert!(error.to_string().starts_with("error loading dataset"));
        assert_eq!(
            error.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn startup_errors_name_the_artifact() {
        let error = AppError::from(SchemaError::Empty);
        assert_eq!(
            error.to_string(),
            "error loading feature columns: feature schema lists no features"
        );
    }

    #[test]
    fn full_registry_maps_to_service_unavailable() {
        let error = AppError::from(RegistryFull { limit: 4 });
        assert_eq!(
            error.to_string(),
            "session error: session limit of 4 reached; try again later"
        );
        assert_eq!(
            error.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
