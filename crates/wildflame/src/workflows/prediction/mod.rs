//! Fire-risk prediction workflow.
//!
//! Raw text inputs are validated against the feature schema, assembled into a
//! typed vector, classified, scored for severity when the label is positive, and
//! annotated with a best-effort place name. [`PredictionSession`] owns that cycle
//! for one user; [`SessionRegistry`] keeps many of them apart for the HTTP surface.

pub mod classifier;
pub mod forest;
pub mod inputs;
pub mod location;
pub mod registry;
pub mod router;
pub mod schema;
pub mod session;
pub mod severity;
pub mod validation;
pub mod vector;

#[cfg(test)]
mod tests;

pub use classifier::{is_positive, FireClassifier, POSITIVE_LABEL};
pub use forest::{ForestClassifier, ModelError};
pub use inputs::{InputState, UnknownFeature};
pub use location::{
    ConfiguredGeocoder, CoordinateSource, Coordinates, LocationResolver, LookupError,
    NominatimGeocoder, OfflineGeocoder, ResolvedLocation, ReverseGeocoder, UNKNOWN_LOCATION,
};
pub use registry::{
    RegistryFull, SessionHandle, SessionId, SessionLimits, SessionRegistry, SessionView,
};
pub use router::prediction_router;
pub use schema::{FeatureDetails, FeatureKind, FeatureSchema, FeatureSpec, SchemaError};
pub use session::{PredictionSession, PredictionSnapshot, SessionPhase};
pub use severity::Severity;
pub use validation::{
    validate, FieldOutcome, FieldWarning, InvalidReason, PredictionBlocked, ValidationOutcome,
};
pub use vector::{assemble, FeatureValue, FeatureVector};
