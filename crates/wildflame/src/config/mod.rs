use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::prediction::SessionLimits;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub artifacts: ArtifactConfig,
    pub geocoder: GeocoderConfig,
    pub sessions: SessionLimits,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let artifacts = ArtifactConfig {
            schema_path: path_var("WILDFLAME_SCHEMA_PATH", "data/feature_columns.json"),
            model_path: path_var("WILDFLAME_MODEL_PATH", "data/fire_model.json"),
            history_csv: path_var("WILDFLAME_HISTORY_CSV", "data/forest_fire_history.csv"),
        };

        let mode = GeocoderMode::from_str(
            &env::var("WILDFLAME_GEOCODER").unwrap_or_else(|_| "nominatim".to_string()),
        )?;
        let timeout = match env::var("WILDFLAME_GEOCODER_TIMEOUT_SECS") {
            Ok(raw) if !raw.trim().is_empty() => Some(Duration::from_secs(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidGeocoderTimeout)?,
            )),
            _ => None,
        };

        let geocoder = GeocoderConfig {
            mode,
            endpoint: env::var("WILDFLAME_GEOCODER_URL")
                .unwrap_or_else(|_| DEFAULT_GEOCODER_URL.to_string()),
            user_agent: env::var("WILDFLAME_GEOCODER_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_GEOCODER_USER_AGENT.to_string()),
            timeout,
        };

        let max_sessions = match env::var("WILDFLAME_MAX_SESSIONS") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|max| *max > 0)
                .ok_or(ConfigError::InvalidSessionLimit)?,
            _ => SessionLimits::DEFAULT_MAX_SESSIONS,
        };
        let idle_timeout = match env::var("WILDFLAME_SESSION_IDLE_SECS") {
            Ok(raw) if !raw.trim().is_empty() => Duration::from_secs(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidSessionIdle)?,
            ),
            _ => SessionLimits::DEFAULT_IDLE_TIMEOUT,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            artifacts,
            geocoder,
            sessions: SessionLimits {
                max_sessions,
                idle_timeout,
            },
        })
    }
}

fn path_var(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Locations of the feature schema, classifier artifact, and historical records.
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub schema_path: PathBuf,
    pub model_path: PathBuf,
    pub history_csv: PathBuf,
}

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_GEOCODER_USER_AGENT: &str = "fire_predictor";

/// Which reverse-geocoding backend the location resolver talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocoderMode {
    Nominatim,
    /// Every lookup fails, so place names fall back to the sentinel.
    Offline,
}

impl GeocoderMode {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "nominatim" => Ok(Self::Nominatim),
            "offline" | "none" | "disabled" => Ok(Self::Offline),
            other => Err(ConfigError::UnknownGeocoder(other.to_string())),
        }
    }
}

/// Reverse-geocoding endpoint settings. `timeout: None` waits indefinitely.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub mode: GeocoderMode,
    pub endpoint: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidGeocoderTimeout,
    UnknownGeocoder(String),
    InvalidSessionLimit,
    InvalidSessionIdle,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidGeocoderTimeout => write!(
                f,
                "WILDFLAME_GEOCODER_TIMEOUT_SECS must be a whole number of seconds"
            ),
            ConfigError::UnknownGeocoder(value) => write!(
                f,
                "WILDFLAME_GEOCODER '{value}' is not one of: nominatim, offline"
            ),
            ConfigError::InvalidSessionLimit => {
                write!(f, "WILDFLAME_MAX_SESSIONS must be a positive whole number")
            }
            ConfigError::InvalidSessionIdle => write!(
                f,
                "WILDFLAME_SESSION_IDLE_SECS must be a whole number of seconds"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidGeocoderTimeout
            | ConfigError::UnknownGeocoder(_)
            | ConfigError::InvalidSessionLimit
            | ConfigError::InvalidSessionIdle => None,
        }
    }
}
