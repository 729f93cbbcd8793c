//! Feature records.
//!
//! A [`Feature`] is one place record in the GeoJSON-like shape produced by ingestion:
//! an integer `id` plus a `properties` object. Geometry is accepted and ignored.
//!
//! Recognized properties:
//! - `carmen:text`: comma-separated synonyms, the first is the display name
//! - `carmen:text_<lang>`: language-specific names, also indexed
//! - `carmen:center`: `[lon, lat]`
//! - `carmen:addressnumber`: address numbers (strings or integers)
//! - `carmen:format`, `carmen:format_<lang>`: label template overrides

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::IndexError;

/// Synonym list property.
pub const TEXT_KEY: &str = "carmen:text";

/// Prefix of language name properties.
const TEXT_LANG_PREFIX: &str = "carmen:text_";

/// Center point property.
pub const CENTER_KEY: &str = "carmen:center";

/// Address number list property.
pub const ADDRESS_NUMBER_KEY: &str = "carmen:addressnumber";

/// Label template override property.
pub const FORMAT_KEY: &str = "carmen:format";

/// A place record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Identifier, unique within an index.
    pub id: u64,
    /// Record properties.
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Creates a feature from a GeoJSON-like value, checking the id and name.
    pub fn from_value(value: Value) -> Result<Self, IndexError> {
        let Value::Object(mut object) = value else {
            return Err(IndexError::invalid_feature("feature must be a JSON object"));
        };

        let id = object
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| IndexError::invalid_feature("feature needs a non-negative integer id"))?;

        let Some(Value::Object(properties)) = object.remove("properties") else {
            return Err(IndexError::invalid_feature(format!(
                "feature {id} has no properties object"
            )));
        };

        if split_synonyms(properties.get(TEXT_KEY)).is_empty() {
            return Err(IndexError::invalid_feature(format!(
                "feature {id} has no {TEXT_KEY}"
            )));
        }

        Ok(Self { id, properties })
    }

    /// Parses a feature from JSON text.
    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| IndexError::invalid_feature(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Returns the synonyms from `carmen:text`, trimmed and non-empty.
    pub fn synonyms(&self) -> Vec<&str> {
        split_synonyms(self.properties.get(TEXT_KEY))
    }

    /// Returns the display name: the first synonym.
    pub fn text(&self) -> &str {
        self.synonyms().first().copied().unwrap_or_default()
    }

    /// Returns the display name in `lang`, if the feature has one.
    pub fn language_text(&self, lang: &str) -> Option<&str> {
        let key = format!("{TEXT_LANG_PREFIX}{lang}");
        split_synonyms(self.properties.get(&key)).first().copied()
    }

    /// Returns the display name in `lang`, falling back to the default name.
    pub fn name(&self, lang: Option<&str>) -> &str {
        lang.and_then(|lang| self.language_text(lang))
            .unwrap_or_else(|| self.text())
    }

    /// Returns every name that should be indexed: default synonyms, then language names.
    pub fn indexed_names(&self) -> Vec<&str> {
        let mut names = self.synonyms();
        for (key, value) in &self.properties {
            if key.starts_with(TEXT_LANG_PREFIX) {
                for name in split_synonyms(Some(value)) {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        names
    }

    /// Returns the `[lon, lat]` center.
    pub fn center(&self) -> Option<[f64; 2]> {
        let coords = self.properties.get(CENTER_KEY)?.as_array()?;
        match coords.as_slice() {
            [lon, lat] => Some([lon.as_f64()?, lat.as_f64()?]),
            _ => None,
        }
    }

    /// Returns the address numbers as strings.
    pub fn address_numbers(&self) -> Vec<String> {
        self.properties
            .get(ADDRESS_NUMBER_KEY)
            .and_then(Value::as_array)
            .map(|numbers| numbers.iter().filter_map(scalar_text).collect())
            .unwrap_or_default()
    }

    /// Returns true if `number` is one of the feature's address numbers.
    pub fn has_address_number(&self, number: &str) -> bool {
        self.address_numbers().iter().any(|n| n == number)
    }

    /// Returns a property rendered as text. Objects, arrays, and null have no text form.
    pub fn property_text(&self, key: &str) -> Option<String> {
        self.properties.get(key).and_then(scalar_text)
    }

    /// Returns the raw value of the label override for `lang`, or the default override.
    pub fn format_override(&self, lang: Option<&str>) -> Option<&Value> {
        match lang {
            Some(lang) => self.properties.get(&format!("{FORMAT_KEY}_{lang}")),
            None => self.properties.get(FORMAT_KEY),
        }
    }
}

/// Splits a comma-separated synonym property.
fn split_synonyms(value: Option<&Value>) -> Vec<&str> {
    value
        .and_then(Value::as_str)
        .map(|text| {
            text.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Renders a scalar JSON value as text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
