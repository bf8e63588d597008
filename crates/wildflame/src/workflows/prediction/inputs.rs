use serde::ser::{Serialize, SerializeMap, Serializer};

use super::schema::FeatureSchema;

/// Raw text entered for every schema feature, in schema order. `""` means unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputState {
    values: Vec<(String, String)>,
}

impl InputState {
    pub fn blank(schema: &FeatureSchema) -> Self {
        Self {
            values: schema
                .names()
                .map(|name| (name.to_string(), String::new()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(feature, _)| feature == name)
            .map(|(_, raw)| raw.as_str())
    }

    /// Store `raw` verbatim. Names outside the schema are rejected so the key set
    /// never drifts from the schema.
    pub fn set(&mut self, name: &str, raw: impl Into<String>) -> Result<(), UnknownFeature> {
        let slot = self
            .values
            .iter_mut()
            .find(|(feature, _)| feature == name)
            .ok_or_else(|| UnknownFeature(name.to_string()))?;
        slot.1 = raw.into();
        Ok(())
    }

    pub fn clear(&mut self) {
        for (_, raw) in &mut self.values {
            raw.clear();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.values
            .iter()
            .map(|(name, raw)| (name.as_str(), raw.as_str()))
    }

    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|(_, raw)| raw.is_empty())
    }
}

impl Serialize for InputState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, raw) in &self.values {
            map.serialize_entry(name, raw)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a feature of the loaded schema")]
pub struct UnknownFeature(pub String);
