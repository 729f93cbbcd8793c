//! Phrase indexing for carto.
//!
//! This crate provides the text-matching core of the geocoder:
//! - Phrase encoding: token sequences to stable 64-bit ids
//! - The dictionary cache, a bit-packed prefilter over indexed phrase ids
//! - Token normalization and bidirectional abbreviation replacement
//! - Autocomplete classification of candidate phrases
//! - The feature model, the [`TileStore`] seam, and an in-memory store
//! - Two-phase index building and cache persistence
//!
//! # Example
//!
//! ```
//! use carto_config::IndexConfig;
//! use carto_index::{Feature, IndexBuilder, MemoryStore, encode_phrase};
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let store = MemoryStore::new();
//!     let features = [
//!         r#"{"id": 1, "properties": {"carmen:text": "District Taco"}}"#,
//!         r#"{"id": 2, "properties": {"carmen:text": "Shake Shack"}}"#,
//!     ]
//!     .into_iter()
//!     .map(Feature::from_json)
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//!
//!     let mut builder = IndexBuilder::new(IndexConfig::new("poi")).unwrap();
//!     builder.queue_all(features);
//!     let index = builder.build(&store).await.unwrap();
//!
//!     assert!(index.may_contain(encode_phrase(&["district", "ta"])));
//!     assert!(index.may_contain(encode_phrase(&["shake", "shack"])));
//! });
//! ```

#![warn(missing_docs)]

mod builder;
mod dictcache;
mod error;
mod feature;
mod index;
mod matcher;
mod normalize;
pub mod persist;
mod phrase;
mod store;

pub use builder::{BuildStats, IndexBuilder, index_keys};
pub use dictcache::{DictCache, SUPPORTED_BITS};
pub use error::IndexError;
pub use feature::{ADDRESS_NUMBER_KEY, CENTER_KEY, FORMAT_KEY, Feature, TEXT_KEY};
pub use index::PhraseIndex;
pub use matcher::{MatchKind, MatchQuery, PhraseMatch, classify, relevance};
pub use normalize::{MAX_VARIANTS, PhraseVariant, Token, TokenReplacer, TokenizedText, tokenize};
pub use phrase::{PhraseId, encode_phrase};
pub use store::{GridEntry, MemoryStore, StoreError, TileStore};
