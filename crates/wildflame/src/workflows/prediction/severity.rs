use serde::{Deserialize, Serialize};

use super::vector::FeatureVector;

/// Post-hoc intensity estimate for positive predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const MEDIUM_FLOOR: f64 = 100.0;
    pub const HIGH_FLOOR: f64 = 200.0;

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Buckets are closed below and open above; a NaN score lands in `High`.
    pub fn from_score(score: f64) -> Self {
        if score < Self::MEDIUM_FLOOR {
            Self::Low
        } else if (Self::MEDIUM_FLOOR..Self::HIGH_FLOOR).contains(&score) {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// Weight and fallback for one scored input.
struct Term {
    feature: &'static str,
    weight: f64,
    default: f64,
}

// RH defaults to 100 while the others default to 0.
const TERMS: [Term; 7] = [
    Term { feature: "FFMC", weight: 0.30, default: 0.0 },
    Term { feature: "DMC", weight: 0.20, default: 0.0 },
    Term { feature: "DC", weight: 0.15, default: 0.0 },
    Term { feature: "ISI", weight: 0.10, default: 0.0 },
    Term { feature: "temp", weight: 0.10, default: 0.0 },
    Term { feature: "wind", weight: 0.10, default: 0.0 },
    Term { feature: "RH", weight: -0.05, default: 100.0 },
];

/// Weighted fire-weather score; features are looked up by exact name.
pub fn severity_score(vector: &FeatureVector) -> f64 {
    TERMS
        .iter()
        .map(|term| term.weight * vector.number(term.feature).unwrap_or(term.default))
        .sum()
}

pub fn score(vector: &FeatureVector) -> Severity {
    Severity::from_score(severity_score(vector))
}
