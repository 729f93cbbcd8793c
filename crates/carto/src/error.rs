//! Error types for the geocoder.

use carto_config::ConfigError;
use carto_index::IndexError;
use carto_template::TemplateError;
use thiserror::Error;

/// Errors that stop a geocoder from being built or a query from running.
///
/// Store failures are not here: a failed lookup drops that lookup and the query returns
/// whatever else it found.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Configuration could not be loaded or resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An index could not be built or reopened.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// An index-level label template does not parse.
    #[error("index '{index}': invalid {key}:\n{source}")]
    Template {
        /// Index whose template failed.
        index: String,
        /// Configuration key holding the template.
        key: String,
        /// Underlying parse error.
        source: TemplateError,
    },

    /// A query option is out of range.
    #[error("invalid option {name}: {message}")]
    InvalidOption {
        /// Option name.
        name: &'static str,
        /// What is wrong with it.
        message: String,
    },
}
