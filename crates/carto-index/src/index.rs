//! Built phrase indexes.

use std::path::Path;

use carto_config::IndexConfig;

use crate::{
    DictCache, IndexError, PhraseId, PhraseVariant, TokenReplacer,
    persist::{load_cache, save_cache},
};

/// An immutable, built index: its configuration, abbreviation map, and dictionary cache.
///
/// Produced by [`crate::IndexBuilder::build`] or reopened with [`PhraseIndex::open`], then
/// shared read-only (typically behind `Arc`).
#[derive(Debug)]
pub struct PhraseIndex {
    /// Resolved index configuration.
    config: IndexConfig,
    /// Abbreviation map built from `config.tokens`.
    replacer: TokenReplacer,
    /// Membership prefilter over every indexed key.
    cache: DictCache,
}

impl PhraseIndex {
    /// Assembles an index from its parts.
    pub(crate) fn new(config: IndexConfig, replacer: TokenReplacer, cache: DictCache) -> Self {
        Self {
            config,
            replacer,
            cache,
        }
    }

    /// Reopens an index whose grids are already in the store, loading the cache saved in
    /// `dir` with [`PhraseIndex::save`].
    pub fn open(config: IndexConfig, dir: &Path) -> Result<Self, IndexError> {
        let cache = load_cache(dir, &config)?;
        let replacer = TokenReplacer::new(&config.tokens);
        Ok(Self::new(config, replacer, cache))
    }

    /// Saves the dictionary cache and its fingerprint into `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), IndexError> {
        save_cache(dir, &self.config, &self.cache)
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Administrative level of the index's features.
    pub fn level(&self) -> &str {
        &self.config.level
    }

    /// Resolved configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The dictionary cache.
    pub fn cache(&self) -> &DictCache {
        &self.cache
    }

    /// Returns false if `key` is certainly not indexed.
    pub fn may_contain(&self, key: PhraseId) -> bool {
        self.cache.has(key.get())
    }

    /// Returns every spelling of `tokens` under this index's abbreviations.
    pub fn variants(&self, tokens: &[String]) -> Vec<PhraseVariant> {
        self.replacer.variants(tokens)
    }
}
