//! Test helpers shared across carto-config unit tests.
//!
//! Kept behind `cfg(test)` to avoid leaking into the public API surface.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

/// File name used for configs written by [`TestDir::write_config`].
pub const CONFIG_FILENAME: &str = "carto.toml";

/// Temporary directory utility for tests.
pub struct TestDir {
    /// Directory removed on drop.
    root: TempDir,
}

impl TestDir {
    /// Creates a new temporary directory.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    /// Returns the path to the root.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Writes `carto.toml` with the given contents at the root.
    pub fn write_config(&self, content: &str) -> PathBuf {
        let config = self.root.path().join(CONFIG_FILENAME);
        fs::write(&config, content).unwrap();
        config
    }
}
