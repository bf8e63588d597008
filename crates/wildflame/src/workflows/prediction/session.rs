use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::{info, warn};

use super::classifier::{is_positive, FireClassifier};
use super::inputs::{InputState, UnknownFeature};
use super::location::{LocationResolver, ResolvedLocation, ReverseGeocoder};
use super::schema::FeatureSchema;
use super::severity::{self, Severity};
use super::validation::{validate, validate_field, FieldOutcome, PredictionBlocked, ValidationOutcome};
use super::vector::FeatureVector;

/// Where a session is in its predict/reset cycle. No phase is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    /// Transient: held only inside [`PredictionSession::trigger_predict`] while the
    /// session lock is taken, so callers reading through the lock never see it.
    Predicting,
    Predicted,
}

impl SessionPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Predicting => "Predicting",
            Self::Predicted => "Predicted",
        }
    }
}

/// Result of one successful prediction. Replaced whole, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSnapshot {
    pub label: String,
    #[serde(serialize_with = "serialize_severity")]
    pub severity: Option<Severity>,
    pub location: ResolvedLocation,
}

impl PredictionSnapshot {
    pub fn is_positive(&self) -> bool {
        is_positive(&self.label)
    }

    /// `""` when severity was not computed.
    pub fn severity_label(&self) -> &'static str {
        self.severity.map(Severity::label).unwrap_or("")
    }
}

fn serialize_severity<S: Serializer>(
    severity: &Option<Severity>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(severity.map(Severity::label).unwrap_or(""))
}

/// One user's prediction workflow: the inputs typed so far and the latest result.
pub struct PredictionSession<C, G> {
    schema: Arc<FeatureSchema>,
    classifier: Arc<C>,
    locator: LocationResolver<G>,
    inputs: InputState,
    snapshot: Option<PredictionSnapshot>,
    phase: SessionPhase,
}

impl<C, G> PredictionSession<C, G>
where
    C: FireClassifier,
    G: ReverseGeocoder,
{
    pub fn new(schema: Arc<FeatureSchema>, classifier: Arc<C>, geocoder: Arc<G>) -> Self {
        let inputs = InputState::blank(&schema);
        Self {
            schema,
            classifier,
            locator: LocationResolver::new(geocoder),
            inputs,
            snapshot: None,
            phase: SessionPhase::Idle,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn inputs(&self) -> &InputState {
        &self.inputs
    }

    pub fn validation(&self) -> ValidationOutcome {
        validate(&self.inputs, &self.schema)
    }

    /// Store a raw value and report how it classifies. Malformed values are kept
    /// so that a later predict reports them; only unknown names are refused.
    pub fn set_feature(
        &mut self,
        name: &str,
        raw: impl Into<String>,
    ) -> Result<FieldOutcome, UnknownFeature> {
        let kind = self
            .schema
            .kind_of(name)
            .ok_or_else(|| UnknownFeature(name.to_string()))?;
        let raw = raw.into();
        let outcome = validate_field(kind, &raw);
        self.inputs.set(name, raw)?;
        Ok(outcome)
    }

    /// Run the full predict transition. A blocked request leaves inputs, phase,
    /// and any earlier snapshot untouched.
    pub fn trigger_predict(&mut self) -> Result<&PredictionSnapshot, PredictionBlocked> {
        let vector = match validate(&self.inputs, &self.schema).into_vector() {
            Ok(vector) => vector,
            Err(blocked) => {
                match &blocked {
                    PredictionBlocked::Incomplete { missing } => {
                        warn!(?missing, "prediction blocked: {blocked}")
                    }
                    PredictionBlocked::Invalid { fields } => {
                        let invalid: Vec<&str> =
                            fields.iter().map(|field| field.feature.as_str()).collect();
                        warn!(?invalid, "prediction blocked: {blocked}")
                    }
                }
                return Err(blocked);
            }
        };

        self.phase = SessionPhase::Predicting;
        let snapshot = self.run_prediction(&vector);
        info!(
            label = %snapshot.label,
            severity = snapshot.severity_label(),
            place = %snapshot.location.place_name,
            "prediction completed"
        );

        self.phase = SessionPhase::Predicted;
        Ok(self.snapshot.insert(snapshot))
    }

    fn run_prediction(&self, vector: &FeatureVector) -> PredictionSnapshot {
        let label = self.classifier.predict(vector);
        let severity = is_positive(&label).then(|| severity::score(vector));
        let location = self.locator.resolve(vector);

        PredictionSnapshot {
            label,
            severity,
            location,
        }
    }

    /// Clear every input and the snapshot, returning to `Idle`.
    pub fn trigger_reset(&mut self) {
        self.inputs.clear();
        self.snapshot = None;
        self.phase = SessionPhase::Idle;
        info!("session reset");
    }

    pub fn read_snapshot(&self) -> Option<&PredictionSnapshot> {
        self.snapshot.as_ref()
    }
}
