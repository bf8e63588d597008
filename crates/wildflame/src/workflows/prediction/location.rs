use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::vector::FeatureVector;
use crate::config::{GeocoderConfig, GeocoderMode};

/// Continent-scale fallback used when the inputs carry no coordinates.
pub const DEFAULT_LATITUDE: f64 = 20.5937;
pub const DEFAULT_LONGITUDE: f64 = 78.9629;
pub const UNKNOWN_LOCATION: &str = "Unknown location";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Whether the coordinates came from the inputs or from the fallback point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSource {
    Supplied,
    /// Only one of latitude/longitude was supplied.
    Partial,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub coordinates: Coordinates,
    pub source: CoordinateSource,
    pub place_name: String,
}

pub fn coordinates_for(vector: &FeatureVector) -> (Coordinates, CoordinateSource) {
    let latitude = vector.number("latitude");
    let longitude = vector.number("longitude");
    let source = match (latitude, longitude) {
        (Some(_), Some(_)) => CoordinateSource::Supplied,
        (None, None) => CoordinateSource::Defaulted,
        _ => CoordinateSource::Partial,
    };

    let coordinates = Coordinates {
        latitude: latitude.unwrap_or(DEFAULT_LATITUDE),
        longitude: longitude.unwrap_or(DEFAULT_LONGITUDE),
    };
    (coordinates, source)
}

/// External reverse-geocoding collaborator.
pub trait ReverseGeocoder: Send + Sync {
    fn reverse_lookup(&self, coordinates: Coordinates) -> Result<String, LookupError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("geocoder request failed: {0}")]
    Transport(String),
    #[error("geocoder responded with HTTP {0}")]
    Status(u16),
    #[error("geocoder response was malformed: {0}")]
    Malformed(String),
    #[error("no place found near {0}")]
    NoMatch(Coordinates),
    #[error("reverse geocoding is disabled")]
    Disabled,
}

/// Best-effort place naming. Lookup failures never escape: they collapse to
/// [`UNKNOWN_LOCATION`].
pub struct LocationResolver<G> {
    geocoder: Arc<G>,
}

impl<G> Clone for LocationResolver<G> {
    fn clone(&self) -> Self {
        Self {
            geocoder: Arc::clone(&self.geocoder),
        }
    }
}

impl<G: ReverseGeocoder> LocationResolver<G> {
    pub fn new(geocoder: Arc<G>) -> Self {
        Self { geocoder }
    }

    pub fn resolve(&self, vector: &FeatureVector) -> ResolvedLocation {
        let (coordinates, source) = coordinates_for(vector);
        let place_name = match self.geocoder.reverse_lookup(coordinates) {
            Ok(name) => name,
            Err(error) => {
                tracing::warn!(%coordinates, %error, "reverse geocoding failed");
                UNKNOWN_LOCATION.to_string()
            }
        };

        ResolvedLocation {
            coordinates,
            source,
            place_name,
        }
    }
}

/// Client for a Nominatim-compatible `/reverse` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl NominatimGeocoder {
    /// Builds a blocking client; call this off the async runtime's worker threads.
    pub fn new(config: &GeocoderConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    fn reverse_lookup(&self, coordinates: Coordinates) -> Result<String, LookupError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("accept-language", "en".to_string()),
            ])
            .send()
            .map_err(|err| LookupError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .map_err(|err| LookupError::Transport(err.to_string()))?;
        parse_reverse_response(&body, coordinates)
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn parse_reverse_response(body: &str, coordinates: Coordinates) -> Result<String, LookupError> {
    let parsed: ReverseResponse =
        serde_json::from_str(body).map_err(|err| LookupError::Malformed(err.to_string()))?;

    match parsed.display_name {
        Some(name) if !name.trim().is_empty() => Ok(name),
        _ => {
            if let Some(reason) = parsed.error {
                tracing::debug!(%coordinates, %reason, "geocoder reported no match");
            }
            Err(LookupError::NoMatch(coordinates))
        }
    }
}

/// Geocoder that always fails, for offline deployments and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGeocoder;

impl ReverseGeocoder for OfflineGeocoder {
    fn reverse_lookup(&self, _coordinates: Coordinates) -> Result<String, LookupError> {
        Err(LookupError::Disabled)
    }
}

/// Backend selected by [`GeocoderConfig::mode`].
#[derive(Debug, Clone)]
pub enum ConfiguredGeocoder {
    Nominatim(NominatimGeocoder),
    Offline(OfflineGeocoder),
}

impl ConfiguredGeocoder {
    pub fn from_config(config: &GeocoderConfig) -> Result<Self, reqwest::Error> {
        match config.mode {
            GeocoderMode::Nominatim => Ok(Self::Nominatim(NominatimGeocoder::new(config)?)),
            GeocoderMode::Offline => Ok(Self::Offline(OfflineGeocoder)),
        }
    }
}

impl ReverseGeocoder for ConfiguredGeocoder {
    fn reverse_lookup(&self, coordinates: Coordinates) -> Result<String, LookupError> {
        match self {
            Self::Nominatim(geocoder) => geocoder.reverse_lookup(coordinates),
            Self::Offline(geocoder) => geocoder.reverse_lookup(coordinates),
        }
    }
}
