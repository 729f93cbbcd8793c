//! Error types for carto configuration.

use std::{io, path::PathBuf};

use thiserror::Error;
use toml::de;

/// Errors that can occur when loading or resolving configuration.
///
/// All of these are fatal: an index whose configuration fails to resolve cannot be
/// queried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse config file {path}: {source}")]
    ParseToml {
        /// Path to the file that could not be parsed.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: de::Error,
    },

    /// Failed to parse a JSON index configuration.
    #[error("failed to parse index config '{index}': {source}")]
    ParseJson {
        /// Name of the index being configured.
        index: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// An index-level format template is present but is not a string.
    #[error("index '{index}': {key} must be a string")]
    InvalidFormat {
        /// Name of the index.
        index: String,
        /// The offending key, e.g. `geocoder_format_de`.
        key: String,
    },

    /// The dictionary cache size is not one of the supported bit sizes.
    #[error("index '{index}': unsupported dictcache_bits {bits} (expected 24 or 28)")]
    InvalidCacheBits {
        /// Name of the index.
        index: String,
        /// The requested bit size.
        bits: u8,
    },

    /// A geocoder setting is out of range.
    #[error("invalid setting {name}: {message}")]
    InvalidSetting {
        /// Setting name.
        name: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// Two indexes share the same name.
    #[error("duplicate index name: {name}")]
    DuplicateIndex {
        /// The repeated name.
        name: String,
    },
}
