//! Label template selection and rendering.
//!
//! Index-level templates are compiled once when the geocoder is built; record overrides are
//! compiled when a label needs them. For a result in language `lang` the first of these
//! wins:
//! 1. the record's `carmen:format_<lang>`, else the index's `geocoder_format_<lang>` when
//!    the index declares `lang`
//! 2. the record's `carmen:format`
//! 3. the index's `geocoder_format`
//!
//! A record override that is not a string, or that does not parse, is skipped.

use std::{borrow::Cow, collections::BTreeMap};

use carto_config::{FORMAT_LANG_PREFIX, IndexConfig};
use carto_index::Feature;
use carto_template::{HelperRegistry, Scope, Template, tidy_label};
use serde_json::Value;
use tracing::debug;

use crate::GeocodeError;

/// Compiled index-level templates.
#[derive(Debug, Clone, Default)]
pub(crate) struct IndexLabels {
    /// `geocoder_format`.
    default: Option<Template>,
    /// `geocoder_format_<lang>` by language.
    languages: BTreeMap<String, Template>,
}

impl IndexLabels {
    /// Compiles every template in `config`.
    pub fn compile(config: &IndexConfig) -> Result<Self, GeocodeError> {
        let compile = |key: String, source: &str| {
            Template::compile(source).map_err(|source| GeocodeError::Template {
                index: config.name.clone(),
                key,
                source,
            })
        };

        let default = config
            .format
            .as_deref()
            .map(|source| compile("geocoder_format".to_string(), source))
            .transpose()?;
        let mut languages = BTreeMap::new();
        for (lang, source) in &config.formats {
            let template = compile(format!("{FORMAT_LANG_PREFIX}{lang}"), source)?;
            languages.insert(lang.clone(), template);
        }

        Ok(Self { default, languages })
    }

    /// Picks the template for `feature` in `language`.
    pub fn select<'a>(
        &'a self,
        config: &IndexConfig,
        feature: &Feature,
        language: Option<&str>,
    ) -> Option<Cow<'a, Template>> {
        if let Some(lang) = language {
            if let Some(template) = record_override(feature, Some(lang)) {
                return Some(Cow::Owned(template));
            }
            if config.declares_language(lang)
                && let Some(template) = self.languages.get(lang)
            {
                return Some(Cow::Borrowed(template));
            }
        }
        if let Some(template) = record_override(feature, None) {
            return Some(Cow::Owned(template));
        }
        self.default.as_ref().map(Cow::Borrowed)
    }
}

/// Compiles a record's override, if it has a usable one.
fn record_override(feature: &Feature, language: Option<&str>) -> Option<Template> {
    let value = feature.format_override(language)?;
    let Value::String(source) = value else {
        debug!(id = feature.id, ?language, "ignoring non-string format override");
        return None;
    };
    match Template::compile(source) {
        Ok(template) => Some(template),
        Err(err) => {
            debug!(
                id = feature.id,
                ?language,
                error = %err.kind,
                "ignoring unparseable format override"
            );
            None
        }
    }
}

/// Renders a label. Without a template, or when the template renders to nothing, the
/// label is `fallback`.
pub(crate) fn render_label<S: Scope + ?Sized>(
    template: Option<&Template>,
    scope: &S,
    helpers: &HelperRegistry,
    fallback: &str,
) -> String {
    let label = template
        .map(|template| tidy_label(&template.render(scope, helpers)))
        .unwrap_or_default();
    if label.is_empty() {
        fallback.to_string()
    } else {
        label
    }
}
