//! Configuration system for carto.
//!
//! A geocoder is configured with a TOML file holding a `[settings]` table and one
//! `[index.<name>]` table per index. Index tables use the same keys as standalone JSON index
//! configs (`geocoder_format`, `geocoder_tokens`, ...), so both sources resolve through
//! [`IndexConfig`].
//!
//! ```toml
//! [settings]
//! limit = 5
//!
//! [index.address]
//! geocoder_address = 1
//! geocoder_format = "{{address.number}} {{address.name}}, {{place.name}}"
//!
//! [index.address.geocoder_tokens]
//! Street = "St"
//! ```

#![warn(missing_docs)]

mod error;
mod parse;
#[cfg(test)]
mod test_support;
mod validate;

use std::{collections::BTreeMap, path::Path};

pub use error::ConfigError;
pub use parse::{
    Flag, RawConfig, RawIndexConfig, RawSettings, parse_config_file, parse_config_str,
    parse_index_json,
};
use serde_json::Value;
pub use validate::ConfigWarning;
use validate::validate_config;

/// Dictionary cache bit size used when an index does not set `dictcache_bits`.
pub const DEFAULT_CACHE_BITS: u8 = 24;

/// Prefix of per-language format keys.
pub const FORMAT_LANG_PREFIX: &str = "geocoder_format_";

/// Fully resolved geocoder configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Geocoder settings.
    pub settings: Settings,
    /// Indexes in query order.
    pub indexes: Vec<IndexConfig>,
}

impl Config {
    /// Loads and resolves a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_raw(parse_config_file(path)?)
    }

    /// Parses and resolves configuration from a TOML string.
    ///
    /// The `path` parameter is used for error reporting.
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        Self::from_raw(parse_config_str(contents, path)?)
    }

    /// Resolves a parsed configuration, applying defaults and checking values.
    ///
    /// Indexes are ordered by their config key.
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let settings = Settings::resolve(raw.settings.unwrap_or_default())?;

        let mut indexes: Vec<IndexConfig> = Vec::new();
        for (key, raw_index) in raw.index.unwrap_or_default() {
            let index = IndexConfig::resolve(&key, raw_index)?;
            if indexes.iter().any(|existing| existing.name == index.name) {
                return Err(ConfigError::DuplicateIndex { name: index.name });
            }
            indexes.push(index);
        }

        Ok(Self { settings, indexes })
    }

    /// Returns the index with the given name.
    pub fn index(&self, name: &str) -> Option<&IndexConfig> {
        self.indexes.iter().find(|index| index.name == name)
    }

    /// Validates the configuration and returns any warnings.
    ///
    /// This checks for:
    /// - Empty configuration (no indexes defined)
    /// - Language formats for languages the index does not declare
    /// - Token replacements with an empty side
    /// - Keys the geocoder does not understand
    pub fn validate(&self) -> Vec<ConfigWarning> {
        validate_config(self)
    }
}

/// Geocoder-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Maximum results returned per query.
    pub limit: usize,
    /// Maximum candidates that get a full context check.
    pub limit_verify: usize,
    /// Maximum concurrent store lookups.
    pub concurrency: usize,
    /// Per-lookup timeout in milliseconds.
    pub lookup_timeout_ms: u64,
    /// Queries longer than this many tokens are truncated.
    pub max_query_tokens: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limit: 5,
            limit_verify: 10,
            concurrency: 8,
            lookup_timeout_ms: 5_000,
            max_query_tokens: 20,
        }
    }
}

impl Settings {
    /// Applies defaults to raw settings and rejects zero values.
    fn resolve(raw: RawSettings) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Self {
            limit: raw.limit.unwrap_or(defaults.limit),
            limit_verify: raw.limit_verify.unwrap_or(defaults.limit_verify),
            concurrency: raw.concurrency.unwrap_or(defaults.concurrency),
            lookup_timeout_ms: raw.lookup_timeout_ms.unwrap_or(defaults.lookup_timeout_ms),
            max_query_tokens: raw.max_query_tokens.unwrap_or(defaults.max_query_tokens),
        };

        let checks: [(&'static str, u64); 5] = [
            ("limit", settings.limit as u64),
            ("limit_verify", settings.limit_verify as u64),
            ("concurrency", settings.concurrency as u64),
            ("lookup_timeout_ms", settings.lookup_timeout_ms),
            ("max_query_tokens", settings.max_query_tokens as u64),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(ConfigError::InvalidSetting {
                    name,
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(settings)
    }
}

/// Resolved configuration of one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Index name, the prefix of result ids (`<name>.<feature id>`).
    pub name: String,
    /// Administrative level of the index's features, e.g. `place` or `address`.
    pub level: String,
    /// Whether features carry address numbers.
    pub address: bool,
    /// Default label template.
    pub format: Option<String>,
    /// Per-language label templates from `geocoder_format_<lang>`.
    pub formats: BTreeMap<String, String>,
    /// Languages with dedicated label support.
    pub languages: Vec<String>,
    /// Abbreviation map from `geocoder_tokens`.
    pub tokens: BTreeMap<String, String>,
    /// Maximum tile zoom, carried for the storage collaborator.
    pub maxzoom: Option<u8>,
    /// Dictionary cache size in bits.
    pub dictcache_bits: u8,
    /// Keys present in the source that the geocoder does not use.
    pub unknown_keys: Vec<String>,
}

impl IndexConfig {
    /// Creates a configuration with defaults: level equal to the name, no address numbers,
    /// no formats.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            level: name.clone(),
            name,
            address: false,
            format: None,
            formats: BTreeMap::new(),
            languages: Vec::new(),
            tokens: BTreeMap::new(),
            maxzoom: None,
            dictcache_bits: DEFAULT_CACHE_BITS,
            unknown_keys: Vec::new(),
        }
    }

    /// Parses and resolves a JSON index configuration.
    ///
    /// `key` is the index name unless the config sets `geocoder_name`.
    pub fn from_json(key: &str, contents: &str) -> Result<Self, ConfigError> {
        Self::resolve(key, parse_index_json(contents, key)?)
    }

    /// Resolves an already-parsed JSON value.
    pub fn from_value(key: &str, value: Value) -> Result<Self, ConfigError> {
        let raw: RawIndexConfig =
            serde_json::from_value(value).map_err(|source| ConfigError::ParseJson {
                index: key.to_string(),
                source,
            })?;
        Self::resolve(key, raw)
    }

    /// Resolves a raw index configuration.
    pub fn resolve(key: &str, raw: RawIndexConfig) -> Result<Self, ConfigError> {
        let mut config = Self::new(raw.geocoder_name.unwrap_or_else(|| key.to_string()));
        if let Some(level) = raw.geocoder_type {
            config.level = level;
        }
        config.address = raw.geocoder_address.is_some_and(Flag::as_bool);
        config.format = format_string(&config.name, "geocoder_format", raw.geocoder_format)?;
        config.languages = raw.geocoder_languages.unwrap_or_default();
        config.tokens = raw.geocoder_tokens.unwrap_or_default();
        config.maxzoom = raw.maxzoom;

        let bits = raw.dictcache_bits.unwrap_or(DEFAULT_CACHE_BITS);
        if bits != 24 && bits != 28 {
            return Err(ConfigError::InvalidCacheBits {
                index: config.name,
                bits,
            });
        }
        config.dictcache_bits = bits;

        for (key, value) in raw.extra {
            match key.strip_prefix(FORMAT_LANG_PREFIX) {
                Some(lang) if !lang.is_empty() => {
                    if let Some(template) = format_string(&config.name, &key, Some(value))? {
                        config.formats.insert(lang.to_string(), template);
                    }
                }
                _ => config.unknown_keys.push(key),
            }
        }

        Ok(config)
    }

    /// Returns true if the index declares `lang` in `geocoder_languages`.
    pub fn declares_language(&self, lang: &str) -> bool {
        self.languages.iter().any(|l| l == lang)
    }

    /// Returns the index template for `lang`, if the language is declared and has one.
    pub fn language_format(&self, lang: &str) -> Option<&str> {
        if !self.declares_language(lang) {
            return None;
        }
        self.formats.get(lang).map(String::as_str)
    }
}

/// Extracts a template string, rejecting non-string values.
fn format_string(
    index: &str,
    key: &str,
    value: Option<Value>,
) -> Result<Option<String>, ConfigError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(template)) => Ok(Some(template)),
        Some(_) => Err(ConfigError::InvalidFormat {
            index: index.to_string(),
            key: key.to_string(),
        }),
    }
}
