//! Configuration validation.
//!
//! Validates a loaded configuration and reports warnings for potential issues.

use std::fmt;

use crate::{Config, IndexConfig};

/// A non-fatal warning about the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A `geocoder_format_<lang>` exists for a language missing from `geocoder_languages`,
    /// so it is never selected.
    FormatForUndeclaredLanguage {
        /// Name of the index.
        index: String,
        /// The language of the unused format.
        language: String,
    },
    /// A `geocoder_tokens` entry has an empty side.
    EmptyTokenReplacement {
        /// Name of the index.
        index: String,
        /// The entry's key.
        from: String,
    },
    /// A key the geocoder does not use.
    UnknownKey {
        /// Name of the index.
        index: String,
        /// The unrecognized key.
        key: String,
    },
    /// No indexes are defined.
    NoIndexesDefined,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FormatForUndeclaredLanguage { index, language } => write!(
                f,
                "index '{index}' has geocoder_format_{language} but does not declare '{language}' in geocoder_languages"
            ),
            Self::EmptyTokenReplacement { index, from } => {
                write!(f, "index '{index}' has an empty token replacement for '{from}'")
            }
            Self::UnknownKey { index, key } => {
                write!(f, "index '{index}' has unknown key '{key}'")
            }
            Self::NoIndexesDefined => write!(f, "no indexes are defined in configuration"),
        }
    }
}

/// Validates the configuration and returns any warnings.
pub fn validate_config(config: &Config) -> Vec<ConfigWarning> {
    if config.indexes.is_empty() {
        return vec![ConfigWarning::NoIndexesDefined];
    }

    config.indexes.iter().flat_map(validate_index).collect()
}

/// Validates a single index configuration.
fn validate_index(index: &IndexConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    for language in index.formats.keys() {
        if !index.declares_language(language) {
            warnings.push(ConfigWarning::FormatForUndeclaredLanguage {
                index: index.name.clone(),
                language: language.clone(),
            });
        }
    }

    for (from, to) in &index.tokens {
        if from.trim().is_empty() || to.trim().is_empty() {
            warnings.push(ConfigWarning::EmptyTokenReplacement {
                index: index.name.clone(),
                from: from.clone(),
            });
        }
    }

    for key in &index.unknown_keys {
        warnings.push(ConfigWarning::UnknownKey {
            index: index.name.clone(),
            key: key.clone(),
        });
    }

    warnings
}
