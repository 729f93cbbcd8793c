//! Configuration file parsing.
//!
//! Parses TOML geocoder configs and JSON index configs into intermediate `Raw*` structures
//! that keep every field optional. Resolution into [`crate::Config`] and
//! [`crate::IndexConfig`] happens in a second step so defaults and checks live in one place.

use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;
use serde_with::{OneOrMany, serde_as};

use crate::ConfigError;

/// Raw configuration as parsed directly from a TOML file.
///
/// This mirrors the TOML schema exactly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Geocoder settings section.
    pub settings: Option<RawSettings>,
    /// Index definitions: config key -> index config.
    pub index: Option<BTreeMap<String, RawIndexConfig>>,
}

/// Raw geocoder settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    /// Maximum results returned per query.
    pub limit: Option<usize>,
    /// Maximum candidates that get a full context check.
    pub limit_verify: Option<usize>,
    /// Maximum concurrent store lookups.
    pub concurrency: Option<usize>,
    /// Per-lookup timeout in milliseconds.
    pub lookup_timeout_ms: Option<u64>,
    /// Queries longer than this many tokens are truncated.
    pub max_query_tokens: Option<usize>,
}

/// A boolean that also accepts `0` and `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    /// A real boolean.
    Bool(bool),
    /// An integer; anything non-zero is true.
    Int(i64),
}

impl Flag {
    /// Returns the flag as a boolean.
    pub fn as_bool(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(n) => n != 0,
        }
    }
}

/// Raw per-index configuration, shared by TOML `[index.<name>]` tables and JSON configs.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawIndexConfig {
    /// Display name of the index, used in result ids.
    pub geocoder_name: Option<String>,
    /// Administrative level this index represents.
    pub geocoder_type: Option<String>,
    /// Whether features carry address numbers.
    pub geocoder_address: Option<Flag>,
    /// Default label template. Kept untyped so a non-string value can be reported.
    pub geocoder_format: Option<serde_json::Value>,
    /// Languages with dedicated label support. Accepts a string or an array.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    pub geocoder_languages: Option<Vec<String>>,
    /// Abbreviation map, e.g. `Street = "St"`.
    pub geocoder_tokens: Option<BTreeMap<String, String>>,
    /// Maximum tile zoom of the index.
    pub maxzoom: Option<u8>,
    /// Dictionary cache size in bits (24 or 28).
    pub dictcache_bits: Option<u8>,
    /// Everything else, including `geocoder_format_<lang>` keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Parses a configuration file from disk.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a single index configuration from JSON.
///
/// `index` names the index in error messages.
pub fn parse_index_json(contents: &str, index: &str) -> Result<RawIndexConfig, ConfigError> {
    serde_json::from_str(contents).map_err(|source| ConfigError::ParseJson {
        index: index.to_string(),
        source,
    })
}
