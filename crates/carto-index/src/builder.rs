//! Two-phase index building.
//!
//! The [`IndexBuilder`] queues features, then [`IndexBuilder::build`] runs once:
//! 1. Tokenize every indexed name and expand it into its abbreviation variants
//! 2. Derive the lookup keys of each variant (see [`index_keys`])
//! 3. Set every key in a fresh [`DictCache`] and collect grid entries per key
//! 4. Write features and grids to the store
//!
//! `build` consumes the builder, so the cache has exactly one writer. The returned
//! [`PhraseIndex`] is read-only.

use std::collections::{BTreeMap, BTreeSet};

use carto_config::IndexConfig;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    DictCache, Feature, GridEntry, IndexError, PhraseId, PhraseIndex, PhraseVariant,
    SUPPORTED_BITS, TileStore, TokenReplacer, encode_phrase, tokenize,
};

/// Statistics from a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Features written.
    pub features: usize,
    /// Distinct keys written.
    pub keys: usize,
    /// Grid entries written across all keys.
    pub entries: usize,
}

/// Accumulates features for one index and builds it.
#[derive(Debug)]
pub struct IndexBuilder {
    /// Resolved index configuration.
    config: IndexConfig,
    /// Abbreviation map built from the config.
    replacer: TokenReplacer,
    /// Queued features in queue order.
    queued: Vec<Feature>,
}

impl IndexBuilder {
    /// Creates a builder. Fails if the configured cache size is unsupported.
    pub fn new(config: IndexConfig) -> Result<Self, IndexError> {
        if !SUPPORTED_BITS.contains(&config.dictcache_bits) {
            return Err(IndexError::InvalidBitSize(config.dictcache_bits));
        }
        let replacer = TokenReplacer::new(&config.tokens);
        Ok(Self {
            config,
            replacer,
            queued: Vec::new(),
        })
    }

    /// Queues a feature.
    pub fn queue(&mut self, feature: Feature) {
        self.queued.push(feature);
    }

    /// Validates and queues a GeoJSON-like feature value.
    pub fn queue_value(&mut self, value: Value) -> Result<(), IndexError> {
        self.queue(Feature::from_value(value)?);
        Ok(())
    }

    /// Queues several features.
    pub fn queue_all(&mut self, features: impl IntoIterator<Item = Feature>) {
        self.queued.extend(features);
    }

    /// Number of queued features.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Builds the index, writing features and grids to `store`.
    pub async fn build<S>(self, store: &S) -> Result<PhraseIndex, IndexError>
    where
        S: TileStore + ?Sized,
    {
        let (index, _) = self.build_with_stats(store).await?;
        Ok(index)
    }

    /// Builds the index and reports what was written.
    pub async fn build_with_stats<S>(
        self,
        store: &S,
    ) -> Result<(PhraseIndex, BuildStats), IndexError>
    where
        S: TileStore + ?Sized,
    {
        let name = self.config.name.clone();
        let mut cache = DictCache::new(self.config.dictcache_bits)?;
        let mut grids: BTreeMap<PhraseId, BTreeSet<GridEntry>> = BTreeMap::new();

        for feature in &self.queued {
            for text in feature.indexed_names() {
                let tokens = tokenize(text).words();
                if tokens.is_empty() {
                    debug!(index = %name, id = feature.id, text, "name has no tokens");
                    continue;
                }
                for variant in self.replacer.variants(&tokens) {
                    for key in index_keys(&variant) {
                        cache.set(key.get());
                        grids.entry(key).or_default().insert(GridEntry {
                            feature: feature.id,
                            phrase: variant.tokens.clone(),
                        });
                    }
                }
            }
        }

        let mut stats = BuildStats {
            features: self.queued.len(),
            keys: grids.len(),
            entries: 0,
        };
        for feature in self.queued {
            store.put_feature(&name, feature).await?;
        }
        for (key, entries) in grids {
            stats.entries += entries.len();
            store.put_grids(&name, key, entries.into_iter().collect()).await?;
        }

        info!(
            index = %name,
            features = stats.features,
            keys = stats.keys,
            populated = cache.count_ones(),
            "built phrase index"
        );
        Ok((PhraseIndex::new(self.config, self.replacer, cache), stats))
    }
}

/// Returns the lookup keys of one phrase spelling.
///
/// For each `k` in `1..=n` the whole-token prefix `tokens[..k]` is a key. When token `k-1`
/// is raw input, every proper character prefix of it, following `tokens[..k-1]`, is a key
/// too; these degenerate keys let a partially typed word find the phrase. Replacement outputs
/// never produce degenerate keys.
pub fn index_keys(variant: &PhraseVariant) -> Vec<PhraseId> {
    let tokens = &variant.tokens;
    let mut keys = Vec::new();
    let mut scratch: Vec<String> = Vec::with_capacity(tokens.len());

    for (k, token) in tokens.iter().enumerate() {
        if variant.replaced.get(k) != Some(&true) {
            let mut prefix = String::new();
            let mut chars = token.chars().peekable();
            while let Some(c) = chars.next() {
                if chars.peek().is_none() {
                    break;
                }
                prefix.push(c);
                scratch.push(prefix.clone());
                keys.push(encode_phrase(&scratch));
                scratch.pop();
            }
        }
        scratch.push(token.clone());
        keys.push(encode_phrase(&scratch));
    }

    keys
}
