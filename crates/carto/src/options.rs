//! Per-query options.

use carto_config::Settings;
use serde::{Deserialize, Serialize};

use crate::GeocodeError;

/// Options for one [`crate::Geocoder::geocode`] call.
///
/// Unset limits fall back to the geocoder's [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeOptions {
    /// Let the final query term match the start of a longer phrase.
    pub autocomplete: bool,
    /// Language for names and label templates, e.g. `"es"`.
    pub language: Option<String>,
    /// Candidates that get a full context check.
    pub limit_verify: Option<usize>,
    /// Results returned.
    pub limit: Option<usize>,
}

impl Default for GeocodeOptions {
    fn default() -> Self {
        Self {
            autocomplete: true,
            language: None,
            limit_verify: None,
            limit: None,
        }
    }
}

impl GeocodeOptions {
    /// Sets the language.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the verification limit.
    pub fn limit_verify(mut self, limit_verify: usize) -> Self {
        self.limit_verify = Some(limit_verify);
        self
    }

    /// Sets the result limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Turns autocomplete on or off.
    pub fn autocomplete(mut self, autocomplete: bool) -> Self {
        self.autocomplete = autocomplete;
        self
    }

    /// Resolves both limits against `settings`, rejecting zeros.
    pub(crate) fn limits(&self, settings: &Settings) -> Result<Limits, GeocodeError> {
        Ok(Limits {
            verify: positive("limit_verify", self.limit_verify, settings.limit_verify)?,
            results: positive("limit", self.limit, settings.limit)?,
        })
    }
}

/// Resolved query limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Limits {
    /// Candidates verified.
    pub verify: usize,
    /// Results returned.
    pub results: usize,
}

/// Picks `value` or the default, failing on zero.
fn positive(
    name: &'static str,
    value: Option<usize>,
    default: usize,
) -> Result<usize, GeocodeError> {
    match value {
        Some(0) => Err(GeocodeError::InvalidOption {
            name,
            message: "must be greater than zero".to_string(),
        }),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_settings() {
        let limits = GeocodeOptions::default()
            .limits(&Settings::default())
            .unwrap();
        assert_eq!(limits, Limits { verify: 10, results: 5 });
    }

    #[test]
    fn explicit_limits_win() {
        let limits = GeocodeOptions::default()
            .limit_verify(1)
            .limit(2)
            .limits(&Settings::default())
            .unwrap();
        assert_eq!(limits, Limits { verify: 1, results: 2 });
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = GeocodeOptions::default()
            .limit(0)
            .limits(&Settings::default())
            .unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidOption { name: "limit", .. }));
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let options: GeocodeOptions = serde_json::from_str(r#"{"language": "es"}"#).unwrap();
        assert!(options.autocomplete);
        assert_eq!(options.language.as_deref(), Some("es"));
        assert_eq!(options.limit, None);
    }
}
