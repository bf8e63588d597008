use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Semantic type of a feature, resolved once from its name when the schema loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Calendar fields: non-negative whole numbers.
    Temporal,
    /// Everything else: floating-point measurements.
    Continuous,
}

impl FeatureKind {
    const TEMPORAL_NAMES: [&'static str; 4] = ["date", "day", "month", "year"];

    pub fn for_name(name: &str) -> Self {
        if Self::TEMPORAL_NAMES
            .iter()
            .any(|temporal| name.eq_ignore_ascii_case(temporal))
        {
            Self::Temporal
        } else {
            Self::Continuous
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Temporal => "Temporal (integer)",
            Self::Continuous => "Continuous (number)",
        }
    }
}

/// Reference notes for one of the Canadian fire-weather indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureDetails {
    pub title: &'static str,
    pub purpose: &'static str,
    pub range: &'static str,
    pub significance: &'static [&'static str],
}

static FEATURE_DETAILS: [(&str, FeatureDetails); 4] = [
    (
        "FFMC",
        FeatureDetails {
            title: "Fine Fuel Moisture Code",
            purpose: "Moisture content of surface litter and fine fuels (leaves, small twigs).",
            range: "0 to 101+ (higher = drier fuels)",
            significance: &[
                "A high FFMC means fine fuels are dry and can ignite easily.",
                "Sensitive to wind, temperature, humidity, and precipitation.",
            ],
        },
    ),
    (
        "DMC",
        FeatureDetails {
            title: "Duff Moisture Code",
            purpose: "Moisture content of loosely compacted organic layers (duff) below the surface.",
            range: "0 to 150+ (higher = drier conditions)",
            significance: &[
                "Affects intermediate fuel layers.",
                "Important for sustained fire behavior and fuel consumption.",
            ],
        },
    ),
    (
        "ISI",
        FeatureDetails {
            title: "Initial Spread Index",
            purpose: "Combines FFMC and wind speed to predict the rate of fire spread.",
            range: "No strict upper limit (usually 0 to 50+)",
            significance: &[
                "High ISI means fast-moving fires.",
                "Used for short-term firefighting decisions.",
            ],
        },
    ),
    (
        "FWI",
        FeatureDetails {
            title: "Fire Weather Index",
            purpose: "Overall measure of fire danger, calculated from ISI and BUI.",
            range: "0 to 100+ (or more depending on conditions)",
            significance: &["A higher FWI means a more intense and dangerous fire."],
        },
    ),
];

impl FeatureDetails {
    /// Notes for a feature name, matched case-insensitively.
    pub fn for_name(name: &str) -> Option<&'static FeatureDetails> {
        FEATURE_DETAILS
            .iter()
            .find(|(key, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, details)| details)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static FeatureDetails>,
}

/// Ordered, immutable list of the features the classifier was trained on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    features: Vec<FeatureSpec>,
}

impl FeatureSchema {
    pub fn new<I, S>(names: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut features = Vec::new();

        for name in names {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(SchemaError::BlankName);
            }
            if !seen.insert(name.clone()) {
                return Err(SchemaError::Duplicate(name));
            }
            let kind = FeatureKind::for_name(&name);
            let description = FeatureDetails::for_name(&name);
            features.push(FeatureSpec {
                name,
                kind,
                description,
            });
        }

        if features.is_empty() {
            return Err(SchemaError::Empty);
        }

        Ok(Self { features })
    }

    /// Parse a JSON array of feature names.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SchemaError> {
        let names: Vec<String> = serde_json::from_reader(reader)?;
        Self::new(names)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.features.iter().map(|spec| spec.name.as_str())
    }

    pub fn kind_of(&self, name: &str) -> Option<FeatureKind> {
        self.features
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kind_of(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Schema load failures. Any of these halts the workflow at startup.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read feature schema from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("feature schema must be a JSON array of names: {0}")]
    Format(#[from] serde_json::Error),
    #[error("feature schema lists no features")]
    Empty,
    #[error("feature schema contains a blank feature name")]
    BlankName,
    #[error("feature schema lists '{0}' more than once")]
    Duplicate(String),
}
