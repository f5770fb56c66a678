//! Configuration file handling for harvest.
//!
//! The configuration file is stored at `$HARVEST_HOME/config.json` and names the farm that
//! imports belong to along with import settings. The SQLite store lives next to it.

use crate::db::Db;
use crate::import::DEFAULT_BATCH_SIZE;
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

const APP_NAME: &str = "harvest";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const HARVEST_SQLITE: &str = "harvest.sqlite";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$HARVEST_HOME` and from there it loads `$HARVEST_HOME/config.json` and opens the
/// SQLite store.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the data directory and:
    /// - Creates the SQLite store with the current schema
    /// - Writes an initial `config.json` for `farm_id`
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/harvestrackr`
    /// - `farm_id` - The farm that imported records and history entries belong to
    /// - `batch_size` - Rows per insert during commit, `None` for the default of 50
    ///
    /// # Errors
    /// - Returns an error if the settings are invalid, if the directory already holds a config or
    ///   a database, or if any file operations fail. Nothing is left behind on failure.
    pub async fn create(
        dir: impl Into<PathBuf>,
        farm_id: &str,
        batch_size: Option<usize>,
    ) -> Result<Self> {
        let config_file = ConfigFile::new(farm_id, batch_size.unwrap_or(DEFAULT_BATCH_SIZE));
        config_file.validate()?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the harvest home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "A config file already exists at '{}'",
                config_path.display()
            );
        }

        // The store is created first. A config file on disk makes `harvest init` refuse to run.
        let sqlite_path = root.join(HARVEST_SQLITE);
        let preexisting = utils::is_present(&sqlite_path).await;
        let db = match Db::init(&sqlite_path, &config_file.farm_id).await {
            Ok(db) => db,
            Err(e) => {
                if !preexisting {
                    discard(&sqlite_path).await;
                }
                return Err(e.context("Unable to create SQLite DB"));
            }
        };
        if let Err(e) = config_file.save(&config_path).await {
            drop(db);
            discard(&sqlite_path).await;
            return Err(e);
        }

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    /// This will
    /// - validate that `harvest_home` exists and that the config file exists
    /// - load and validate the config file
    /// - open the SQLite store, migrating it if needed
    pub async fn load(harvest_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = harvest_home.into();
        if !maybe_relative.is_dir() {
            bail!(
                "Harvest home '{}' is missing, run 'harvest init' first",
                maybe_relative.display()
            );
        }
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let sqlite_path = root.join(HARVEST_SQLITE);
        let db = Db::load(&sqlite_path, &config_file.farm_id)
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn farm_id(&self) -> &str {
        &self.config_file.farm_id
    }

    pub fn batch_size(&self) -> usize {
        self.config_file.batch_size
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "harvest",
///   "config_version": 1,
///   "farm_id": "3f6c1d2e-6a0b-4f51-9a55-2b1f0c7d8e90",
///   "batch_size": 50
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "harvest"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The farm that imports are recorded against
    farm_id: String,

    /// Rows per insert call when committing an import
    #[serde(default = "default_batch_size")]
    batch_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl ConfigFile {
    fn new(farm_id: impl Into<String>, batch_size: usize) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            farm_id: farm_id.into(),
            batch_size,
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            self.app_name
        );
        ensure!(
            self.config_version == CONFIG_VERSION,
            "Unsupported config_version {}, expected {}",
            self.config_version,
            CONFIG_VERSION
        );
        ensure!(
            !self.farm_id.trim().is_empty(),
            "The farm_id must not be empty"
        );
        ensure!(self.batch_size > 0, "The batch_size must be greater than 0");
        Ok(())
    }

    /// Loads and validates a ConfigFile from the specified path.
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;
        config
            .validate()
            .with_context(|| format!("Invalid config file at {}", path.display()))?;
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }
}

/// Removes a file left by a failed `create`.
async fn discard(path: &Path) {
    if let Err(e) = utils::remove_file(path).await {
        warn!("{e:#}");
    }
}
