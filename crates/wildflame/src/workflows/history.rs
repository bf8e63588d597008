//! Yearly fire / no-fire counts from the historical records export.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct HistoryRow {
    year: i32,
    #[serde(rename = "Classes", default)]
    classes: Option<String>,
}

/// Incident counts for one year. Every known label appears, zero-filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearTrend {
    pub year: i32,
    pub counts: BTreeMap<String, u32>,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoricalTrends {
    pub labels: Vec<String>,
    pub years: Vec<YearTrend>,
}

impl HistoricalTrends {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Rows without a class label are skipped; labels are trimmed.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, HistoryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut by_year: BTreeMap<i32, BTreeMap<String, u32>> = BTreeMap::new();
        let mut labels = BTreeSet::new();

        for row in csv_reader.deserialize::<HistoryRow>() {
            let row = row?;
            let Some(label) = row
                .classes
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
            else {
                continue;
            };

            labels.insert(label.clone());
            *by_year.entry(row.year).or_default().entry(label).or_insert(0) += 1;
        }

        let years = by_year
            .into_iter()
            .map(|(year, mut counts)| {
                for label in &labels {
                    counts.entry(label.clone()).or_insert(0);
                }
                let total = counts.values().sum();
                YearTrend {
                    year,
                    counts,
                    total,
                }
            })
            .collect();

        Ok(Self {
            labels: labels.into_iter().collect(),
            years,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to open historical records at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid historical records: {0}")]
    Csv(#[from] csv::Error),
}
