//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::Config;
use std::path::PathBuf;
use tempfile::TempDir;
use uuid::Uuid;

/// Test environment that sets up a harvest home directory with Config and database.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    /// Creates a test environment for a random farm with an initialized database.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("harvestrackr");
        let farm_id = Uuid::new_v4().to_string();
        let config = Config::create(&root, &farm_id, None).await.unwrap();
        Self { temp_dir, config }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// Writes `content` to `name` next to (not inside) the harvest home and returns its path.
    pub async fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        tokio::fs::write(&path, content).await.unwrap();
        path
    }
}
