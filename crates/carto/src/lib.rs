//! carto: fuzzy geocoding with templated place labels.
//!
//! A [`Geocoder`] answers free-form queries against phrase indexes built with
//! [`carto_index::IndexBuilder`]. Query text is normalized and split into phrase windows,
//! candidate phrases are pre-filtered by each index's dictionary cache and fetched from a
//! [`carto_index::TileStore`], and every match is labeled by a template rendered against
//! its chain of administrative levels.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use carto::{GeocodeOptions, Geocoder};
//! use carto_config::{IndexConfig, Settings};
//! use carto_index::{IndexBuilder, MemoryStore};
//! use serde_json::json;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let store = Arc::new(MemoryStore::new());
//!     let mut place = IndexBuilder::new(IndexConfig::new("place")).unwrap();
//!     place
//!         .queue_value(json!({"id": 1, "properties": {
//!             "carmen:text": "New York", "carmen:center": [0, 0]
//!         }}))
//!         .unwrap();
//!
//!     let mut config = IndexConfig::new("poi");
//!     config.format = Some("{{poi.name}}, {{place.name}}".to_string());
//!     let mut poi = IndexBuilder::new(config).unwrap();
//!     poi.queue_value(json!({"id": 1, "properties": {
//!         "carmen:text": "Shake Shack", "carmen:center": [0, 0]
//!     }}))
//!     .unwrap();
//!
//!     let indexes = vec![
//!         Arc::new(place.build(store.as_ref()).await.unwrap()),
//!         Arc::new(poi.build(store.as_ref()).await.unwrap()),
//!     ];
//!     let geocoder = Geocoder::new(Settings::default(), indexes, store).unwrap();
//!
//!     let response = geocoder
//!         .geocode("shake sh", &GeocodeOptions::default())
//!         .await
//!         .unwrap();
//!     assert_eq!(response.features[0].place_name, "Shake Shack, New York");
//! });
//! ```

#![warn(missing_docs)]

mod chain;
mod error;
mod geocoder;
mod label;
mod lookup;
mod options;
mod query;
mod rank;

pub use chain::LEVELS;
pub use error::GeocodeError;
pub use geocoder::Geocoder;
pub use options::GeocodeOptions;
pub use rank::{GeocodeFeature, GeocodeResponse};
