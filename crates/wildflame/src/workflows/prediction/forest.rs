//! Decision-forest classifier evaluated from a JSON model artifact.
//!
//! Trees use the usual CART layout: split nodes send a sample left when its value
//! is `<= threshold`, leaves carry per-label weights. The forest averages each
//! tree's normalized leaf weights and picks the first label with the highest mean.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::classifier::FireClassifier;
use super::schema::FeatureSchema;
use super::vector::FeatureVector;

#[derive(Debug, Deserialize)]
struct ForestArtifact {
    labels: Vec<String>,
    trees: Vec<TreeArtifact>,
    #[serde(default)]
    feature_importances: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct TreeArtifact {
    nodes: Vec<NodeArtifact>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NodeArtifact {
    Split {
        feature: String,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: String,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn leaf_for(&self, vector: &FeatureVector) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // A feature absent from the vector compares as NaN and goes right.
                    let value = vector.number(feature).unwrap_or(f64::NAN);
                    index = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Random-forest style classifier loaded once at startup.
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    labels: Vec<String>,
    trees: Vec<DecisionTree>,
    importances: Vec<(String, f64)>,
}

impl ForestClassifier {
    pub fn from_reader<R: Read>(reader: R, schema: &FeatureSchema) -> Result<Self, ModelError> {
        let artifact: ForestArtifact = serde_json::from_reader(reader)?;
        Self::compile(artifact, schema)
    }

    pub fn from_path<P: AsRef<Path>>(path: P, schema: &FeatureSchema) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), schema)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn compile(artifact: ForestArtifact, schema: &FeatureSchema) -> Result<Self, ModelError> {
        if artifact.labels.is_empty() {
            return Err(ModelError::NoLabels);
        }
        if artifact.trees.is_empty() {
            return Err(ModelError::NoTrees);
        }

        let width = artifact.labels.len();
        let mut trees = Vec::with_capacity(artifact.trees.len());

        for (tree_index, tree) in artifact.trees.into_iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelError::EmptyTree { tree: tree_index });
            }
            let node_count = tree.nodes.len();
            let mut nodes = Vec::with_capacity(node_count);

            for (node_index, node) in tree.nodes.into_iter().enumerate() {
                let location = NodeLocation {
                    tree: tree_index,
                    node: node_index,
                };
                nodes.push(match node {
                    NodeArtifact::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if !schema.contains(&feature) {
                            return Err(ModelError::UnknownFeature { location, feature });
                        }
                        for child in [left, right] {
                            // Children after their parent guarantees every walk ends.
                            if child <= node_index || child >= node_count {
                                return Err(ModelError::BadChild { location, child });
                            }
                        }
                        Node::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        }
                    }
                    NodeArtifact::Leaf { value } => {
                        if value.len() != width {
                            return Err(ModelError::LeafWidth {
                                location,
                                expected: width,
                                actual: value.len(),
                            });
                        }
                        Node::Leaf {
                            distribution: normalize(value),
                        }
                    }
                });
            }

            trees.push(DecisionTree { nodes });
        }

        for name in artifact.feature_importances.keys() {
            if !schema.contains(name) {
                return Err(ModelError::UnknownImportance(name.clone()));
            }
        }
        let mut importances: Vec<(String, f64)> = schema
            .names()
            .filter_map(|name| {
                artifact
                    .feature_importances
                    .get(name)
                    .map(|weight| (name.to_string(), *weight))
            })
            .collect();
        importances.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(Self {
            labels: artifact.labels,
            trees,
            importances,
        })
    }
}

fn normalize(weights: Vec<f64>) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        weights.into_iter().map(|weight| weight / total).collect()
    } else {
        vec![0.0; weights.len()]
    }
}

impl FireClassifier for ForestClassifier {
    fn predict(&self, vector: &FeatureVector) -> String {
        let mut votes = vec![0.0; self.labels.len()];
        for tree in &self.trees {
            for (vote, weight) in votes.iter_mut().zip(tree.leaf_for(vector)) {
                *vote += weight;
            }
        }

        let mut best = 0;
        for (index, vote) in votes.iter().enumerate() {
            if *vote > votes[best] {
                best = index;
            }
        }
        self.labels[best].clone()
    }

    fn feature_importances(&self) -> Vec<(String, f64)> {
        self.importances.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLocation {
    pub tree: usize,
    pub node: usize,
}

impl std::fmt::Display for NodeLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tree {} node {}", self.tree, self.node)
    }
}

/// Model artifact load failures. Any of these halts the workflow at startup.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read model artifact from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("model artifact is malformed: {0}")]
    Format(#[from] serde_json::Error),
    #[error("model artifact declares no labels")]
    NoLabels,
    #[error("model artifact contains no trees")]
    NoTrees,
    #[error("tree {tree} has no nodes")]
    EmptyTree { tree: usize },
    #[error("{location} splits on '{feature}', which is not in the feature schema")]
    UnknownFeature {
        location: NodeLocation,
        feature: String,
    },
    #[error("{location} points at child {child}, which is out of order or out of range")]
    BadChild { location: NodeLocation, child: usize },
    #[error("{location} has {actual} leaf weights, expected {expected}")]
    LeafWidth {
        location: NodeLocation,
        expected: usize,
        actual: usize,
    },
    #[error("feature importance given for '{0}', which is not in the feature schema")]
    UnknownImportance(String),
}
