//! Tile store: the storage collaborator behind phrase lookups.
//!
//! The geocoder never owns storage. Grids (phrase key -> matching features), feature records,
//! and spatial context lookups all go through [`TileStore`]. [`MemoryStore`] is an in-process
//! implementation for tests and embedders.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{PoisonError, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Feature, PhraseId};

/// One grid entry: a feature reachable under a phrase key, with the full phrase it was
/// indexed from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridEntry {
    /// Feature id within the index.
    pub feature: u64,
    /// The indexed phrase spelling.
    pub phrase: Vec<String>,
}

/// Errors reported by a store. None of them are retried.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A failure that might succeed if tried again later.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// The lookup did not finish in time.
    #[error("store lookup timed out after {0:?}")]
    Timeout(Duration),

    /// A permanent backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_: PoisonError<T>) -> Self {
        Self::Backend("memory store lock poisoned".to_string())
    }
}

/// Key-value storage for grids and features, partitioned by index name.
///
/// A missing key is an empty result, not an error.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Returns the grid entries stored under `key`.
    async fn get_grids(&self, index: &str, key: PhraseId) -> Result<Vec<GridEntry>, StoreError>;

    /// Adds grid entries under `key`, merging with any already stored.
    async fn put_grids(
        &self,
        index: &str,
        key: PhraseId,
        entries: Vec<GridEntry>,
    ) -> Result<(), StoreError>;

    /// Returns a feature by id.
    async fn get_feature(&self, index: &str, id: u64) -> Result<Option<Feature>, StoreError>;

    /// Stores a feature, replacing any feature with the same id.
    async fn put_feature(&self, index: &str, feature: Feature) -> Result<(), StoreError>;

    /// Returns the feature of `index` that contains, or is nearest to, `center`.
    async fn context(&self, index: &str, center: [f64; 2]) -> Result<Option<Feature>, StoreError>;
}

/// Tables held by a [`MemoryStore`].
#[derive(Debug, Default)]
struct Tables {
    /// (index, key) -> entries.
    grids: HashMap<(String, PhraseId), BTreeSet<GridEntry>>,
    /// index -> id -> feature.
    features: HashMap<String, BTreeMap<u64, Feature>>,
}

/// In-memory [`TileStore`].
///
/// `context` returns the feature whose center is nearest to the query point; ties go to the
/// lowest id and features without a center are never returned.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Guarded tables.
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of features stored for `index`.
    pub fn feature_count(&self, index: &str) -> Result<usize, StoreError> {
        let tables = self.tables.read()?;
        Ok(tables.features.get(index).map_or(0, BTreeMap::len))
    }

    /// Number of grid keys stored for `index`.
    pub fn grid_count(&self, index: &str) -> Result<usize, StoreError> {
        let tables = self.tables.read()?;
        Ok(tables.grids.keys().filter(|(name, _)| name == index).count())
    }
}

#[async_trait]
impl TileStore for MemoryStore {
    async fn get_grids(&self, index: &str, key: PhraseId) -> Result<Vec<GridEntry>, StoreError> {
        let tables = self.tables.read()?;
        Ok(tables
            .grids
            .get(&(index.to_string(), key))
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn put_grids(
        &self,
        index: &str,
        key: PhraseId,
        entries: Vec<GridEntry>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write()?;
        tables
            .grids
            .entry((index.to_string(), key))
            .or_default()
            .extend(entries);
        Ok(())
    }

    async fn get_feature(&self, index: &str, id: u64) -> Result<Option<Feature>, StoreError> {
        let tables = self.tables.read()?;
        Ok(tables
            .features
            .get(index)
            .and_then(|features| features.get(&id))
            .cloned())
    }

    async fn put_feature(&self, index: &str, feature: Feature) -> Result<(), StoreError> {
        let mut tables = self.tables.write()?;
        tables
            .features
            .entry(index.to_string())
            .or_default()
            .insert(feature.id, feature);
        Ok(())
    }

    async fn context(&self, index: &str, center: [f64; 2]) -> Result<Option<Feature>, StoreError> {
        let tables = self.tables.read()?;
        let Some(features) = tables.features.get(index) else {
            return Ok(None);
        };

        let mut best: Option<(f64, &Feature)> = None;
        for feature in features.values() {
            let Some([lon, lat]) = feature.center() else {
                continue;
            };
            let distance = (lon - center[0]).powi(2) + (lat - center[1]).powi(2);
            if best.is_none_or(|(closest, _)| distance < closest) {
                best = Some((distance, feature));
            }
        }

        Ok(best.map(|(_, feature)| feature.clone()))
    }
}
