//! Dictionary cache persistence.
//!
//! A cache is saved next to a fingerprint of the settings that shaped it. When those
//! settings change, the stored fingerprint no longer matches and loading is refused.
//!
//! Settings that affect the fingerprint:
//! - Cache format version (internal, bumped when key generation changes)
//! - Cache bit size
//! - Token replacements

use std::{
    collections::BTreeMap,
    fs,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
};

use carto_config::IndexConfig;
use siphasher::sip::SipHasher24;
use tracing::debug;

use crate::{DictCache, IndexError};

/// Current cache format version. Bump this when index key generation changes.
pub const CACHE_VERSION: u32 = 1;

/// Settings that shape a dictionary cache.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheFingerprint {
    /// Format version.
    pub version: u32,
    /// Cache bit size.
    pub bits: u8,
    /// Abbreviation map.
    pub tokens: BTreeMap<String, String>,
}

impl CacheFingerprint {
    /// Extracts cache-relevant settings from an index config.
    pub fn from_config(config: &IndexConfig) -> Self {
        Self {
            version: CACHE_VERSION,
            bits: config.dictcache_bits,
            tokens: config.tokens.clone(),
        }
    }

    /// Computes the fingerprint hash.
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = SipHasher24::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Computes the hash and returns it as a hex string.
    pub fn hash_string(&self) -> String {
        format!("{:016x}", self.compute_hash())
    }
}

/// Path of the cache file for `index` inside `dir`.
pub fn cache_path(dir: &Path, index: &str) -> PathBuf {
    dir.join(format!("{index}.dict"))
}

/// Path of the fingerprint file for `index` inside `dir`.
pub fn fingerprint_path(dir: &Path, index: &str) -> PathBuf {
    dir.join(format!("{index}.dict.hash"))
}

/// Writes `cache` and its fingerprint for `config` into `dir`.
///
/// Creates `dir` if it doesn't exist.
pub fn save_cache(dir: &Path, config: &IndexConfig, cache: &DictCache) -> Result<(), IndexError> {
    fs::create_dir_all(dir)?;
    let path = cache_path(dir, &config.name);
    cache.write_to(&path)?;
    fs::write(
        fingerprint_path(dir, &config.name),
        CacheFingerprint::from_config(config).hash_string(),
    )?;
    debug!(index = %config.name, path = %path.display(), "saved dictionary cache");
    Ok(())
}

/// Loads the cache for `config` from `dir`.
///
/// Fails with [`IndexError::MissingCache`] if no cache was saved, and with
/// [`IndexError::StaleCache`] if it was saved with different settings or without a
/// fingerprint.
pub fn load_cache(dir: &Path, config: &IndexConfig) -> Result<DictCache, IndexError> {
    let path = cache_path(dir, &config.name);
    if !path.exists() {
        return Err(IndexError::MissingCache { path });
    }

    let expected = CacheFingerprint::from_config(config).hash_string();
    let stored = fs::read_to_string(fingerprint_path(dir, &config.name))
        .ok()
        .map(|s| s.trim().to_string());
    if stored.as_deref() != Some(expected.as_str()) {
        return Err(IndexError::StaleCache { path });
    }

    let cache = DictCache::read_from(&path)?;
    if cache.bit_size() != config.dictcache_bits {
        return Err(IndexError::StaleCache { path });
    }
    Ok(cache)
}
