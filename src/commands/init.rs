use crate::args::InitArgs;
use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What `harvest init` created.
#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub root: PathBuf,
    pub farm_id: String,
    pub batch_size: usize,
}

/// Creates the data directory with:
/// - an initial `config.json` for the farm
/// - the SQLite store with the current schema
///
/// # Errors
/// - Returns an error if the directory is already initialized, the settings are invalid, or any
///   file operation fails.
pub async fn init(harvest_home: &Path, args: &InitArgs) -> Result<Out<InitReport>> {
    let config = Config::create(harvest_home, args.farm_id(), args.batch_size())
        .await
        .context("Unable to create the data directory and configs")?;
    let report = InitReport {
        root: config.root().to_path_buf(),
        farm_id: config.farm_id().to_string(),
        batch_size: config.batch_size(),
    };
    Ok(Out::new(
        format!(
            "Successfully created the harvest directory at {}",
            config.root().display()
        ),
        report,
    ))
}
