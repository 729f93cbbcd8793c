//! Error types for the carto-index crate.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::StoreError;

/// Errors that can occur when building, loading, or persisting a phrase index.
///
/// Cache shape errors surface when a [`crate::DictCache`] is constructed; no later cache
/// operation can fail.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Requested dictionary cache size is not supported.
    #[error("unsupported dictionary cache size: {0} bits (expected 24 or 28)")]
    InvalidBitSize(u8),

    /// A serialized dictionary cache has the wrong length.
    #[error("invalid dictionary cache length: {0} bytes (expected 2097152 or 33554432)")]
    InvalidCacheLength(usize),

    /// A feature record cannot be indexed.
    #[error("invalid feature: {0}")]
    InvalidFeature(String),

    /// A persisted cache was built with different indexing settings.
    #[error("dictionary cache at {path} is stale (built with different settings)")]
    StaleCache {
        /// Path to the cache file.
        path: PathBuf,
    },

    /// No persisted cache exists for the index.
    #[error("no dictionary cache at {path}")]
    MissingCache {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The tile store rejected a write during a build.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl IndexError {
    /// Creates an `InvalidFeature` error.
    pub(crate) fn invalid_feature(message: impl Into<String>) -> Self {
        Self::InvalidFeature(message.into())
    }
}
