use serde::Serialize;
use std::borrow::Cow;

use super::inputs::InputState;
use super::schema::{FeatureKind, FeatureSchema};
use super::vector::{FeatureValue, FeatureVector};

/// Why a non-empty raw value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    NotDigitString,
    IntegerOutOfRange,
    NotANumber,
}

impl InvalidReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotDigitString => "not an integer digit string",
            Self::IntegerOutOfRange => "integer out of range",
            Self::NotANumber => "not a number",
        }
    }
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification of a single raw value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldOutcome {
    Unset,
    Valid { value: FeatureValue },
    Invalid { reason: InvalidReason },
}

impl FieldOutcome {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }
}

/// Classify `raw` for a feature of the given kind. Never fails: malformed text is
/// reported as [`FieldOutcome::Invalid`].
pub fn validate_field(kind: FeatureKind, raw: &str) -> FieldOutcome {
    if raw.is_empty() {
        return FieldOutcome::Unset;
    }

    match kind {
        FeatureKind::Temporal => {
            if !raw.bytes().all(|byte| byte.is_ascii_digit()) {
                return FieldOutcome::Invalid {
                    reason: InvalidReason::NotDigitString,
                };
            }
            match raw.parse::<u64>() {
                Ok(value) => FieldOutcome::Valid {
                    value: FeatureValue::Integer(value),
                },
                Err(_) => FieldOutcome::Invalid {
                    reason: InvalidReason::IntegerOutOfRange,
                },
            }
        }
        FeatureKind::Continuous => match without_digit_separators(raw.trim())
            .and_then(|text| text.parse::<f64>().ok())
        {
            Some(value) => FieldOutcome::Valid {
                value: FeatureValue::Float(value),
            },
            None => FieldOutcome::Invalid {
                reason: InvalidReason::NotANumber,
            },
        },
    }
}

/// Drops `_` digit-group separators (`1_000.5`). Each one must sit between two
/// ASCII digits; anywhere else the text is not a number.
fn without_digit_separators(text: &str) -> Option<Cow<'_, str>> {
    if !text.contains('_') {
        return Some(Cow::Borrowed(text));
    }

    let bytes = text.as_bytes();
    let is_digit_at = |index: Option<usize>| {
        index
            .and_then(|index| bytes.get(index))
            .is_some_and(u8::is_ascii_digit)
    };
    let grouped = bytes
        .iter()
        .enumerate()
        .filter(|(_, byte)| **byte == b'_')
        .all(|(index, _)| is_digit_at(index.checked_sub(1)) && is_digit_at(Some(index + 1)));

    grouped.then(|| Cow::Owned(text.replace('_', "")))
}

/// Per-feature outcomes for a whole input state, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    fields: Vec<FieldReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldReport {
    pub feature: String,
    pub kind: FeatureKind,
    pub outcome: FieldOutcome,
}

impl ValidationOutcome {
    pub fn fields(&self) -> &[FieldReport] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<FieldOutcome> {
        self.fields
            .iter()
            .find(|report| report.feature == name)
            .map(|report| report.outcome)
    }

    /// No feature is unset.
    pub fn is_ready(&self) -> bool {
        !self.fields.iter().any(|report| report.outcome.is_unset())
    }

    /// No feature holds a malformed value.
    pub fn is_valid(&self) -> bool {
        !self.fields.iter().any(|report| report.outcome.is_invalid())
    }

    pub fn missing(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|report| report.outcome.is_unset())
            .map(|report| report.feature.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<FieldWarning> {
        self.fields
            .iter()
            .filter_map(|report| match report.outcome {
                FieldOutcome::Invalid { reason } => Some(FieldWarning {
                    feature: report.feature.clone(),
                    reason,
                    message: FieldWarning::message_for(&report.feature, report.kind),
                }),
                _ => None,
            })
            .collect()
    }

    /// Readiness is checked before validity, so a form with both a blank and a
    /// malformed field reports the blank one.
    pub fn into_vector(self) -> Result<FeatureVector, PredictionBlocked> {
        if !self.is_ready() {
            return Err(PredictionBlocked::Incomplete {
                missing: self.missing(),
            });
        }
        if !self.is_valid() {
            return Err(PredictionBlocked::Invalid {
                fields: self.warnings(),
            });
        }

        let entries = self
            .fields
            .into_iter()
            .filter_map(|report| match report.outcome {
                FieldOutcome::Valid { value } => Some((report.feature, value)),
                FieldOutcome::Unset | FieldOutcome::Invalid { .. } => None,
            })
            .collect();

        Ok(FeatureVector::from_entries(entries))
    }
}

/// Classify every feature of `inputs` against `schema`.
pub fn validate(inputs: &InputState, schema: &FeatureSchema) -> ValidationOutcome {
    let fields = schema
        .features()
        .iter()
        .map(|spec| {
            let raw = inputs.get(&spec.name).unwrap_or("");
            FieldReport {
                feature: spec.name.clone(),
                kind: spec.kind,
                outcome: validate_field(spec.kind, raw),
            }
        })
        .collect();

    ValidationOutcome { fields }
}

/// User-facing warning for one malformed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldWarning {
    pub feature: String,
    pub reason: InvalidReason,
    pub message: String,
}

impl FieldWarning {
    fn message_for(feature: &str, kind: FeatureKind) -> String {
        match kind {
            FeatureKind::Temporal => format!("Please enter only digits for {feature}"),
            FeatureKind::Continuous => format!("Please enter a valid number for {feature}"),
        }
    }
}

/// Advisory outcome of a predict request that could not proceed. The session is
/// left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictionBlocked {
    #[error("Please fill in all values before predicting.")]
    Incomplete { missing: Vec<String> },
    #[error("Invalid input detected. Please correct the values.")]
    Invalid { fields: Vec<FieldWarning> },
}
