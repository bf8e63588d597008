use super::vector::FeatureVector;

/// Label that marks a positive (fire) prediction, compared case-insensitively.
pub const POSITIVE_LABEL: &str = "fire";

/// Boundary to the trained model. Implementations must be pure: the same vector
/// always yields the same label.
pub trait FireClassifier: Send + Sync {
    fn predict(&self, vector: &FeatureVector) -> String;

    /// Relative weight of each feature, highest first. Empty when the model does
    /// not expose importances.
    fn feature_importances(&self) -> Vec<(String, f64)> {
        Vec::new()
    }
}

/// Positivity is equality with "fire", not the presence of the word: "no fire"
/// and "not fire" are negative.
pub fn is_positive(label: &str) -> bool {
    label.to_lowercase() == POSITIVE_LABEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_exact_fire_label_is_positive() {
        for label in ["fire", "Fire", "FIRE"] {
            assert!(is_positive(label), "{label}");
        }
        for label in ["not fire", "no fire", "fire ", "wildfire", "", "0"] {
            assert!(!is_positive(label), "{label:?}");
        }
    }
}
