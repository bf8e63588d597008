use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::inputs::InputState;
use super::schema::FeatureSchema;
use super::validation::{validate, PredictionBlocked};

/// A typed feature value. Temporal features hold integers, the rest hold floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Integer(u64),
    Float(f64),
}

impl FeatureValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(value) => value as f64,
            Self::Float(value) => value,
        }
    }
}

/// Fully typed record in schema order; the only input the classifier sees.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    entries: Vec<(String, FeatureValue)>,
}

impl FeatureVector {
    pub(crate) fn from_entries(entries: Vec<(String, FeatureValue)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<FeatureValue> {
        self.entries
            .iter()
            .find(|(feature, _)| feature == name)
            .map(|(_, value)| *value)
    }

    /// Numeric view of a feature regardless of its kind.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).map(FeatureValue::as_f64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FeatureValue)> + '_ {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Convert raw inputs into a typed vector. Only complete, valid inputs assemble;
/// anything else comes back as the reason prediction is blocked.
pub fn assemble(
    inputs: &InputState,
    schema: &FeatureSchema,
) -> Result<FeatureVector, PredictionBlocked> {
    validate(inputs, schema).into_vector()
}
