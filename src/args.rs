//! These structs provide the CLI interface for the harvest CLI.

use crate::model::{Assignment, ImportKind};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// harvest: import farm expense and income spreadsheets.
///
/// Exports from bank portals, supplier invoices or your own spreadsheets are read as CSV, their
/// columns are matched to HarvesTrackr fields, every row is checked, and the rows are stored in a
/// local database for your farm. Each import is recorded in a history you can review later.
///
/// Start with `harvest init --farm-id <id>`, then `harvest template expenses` to see the expected
/// layout.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, its config file and the local database.
    ///
    /// This is the first command you should run. Pass the id of the farm that imports belong to.
    /// The data directory defaults to $HOME/harvestrackr; pass --harvest-home to put it elsewhere.
    Init(InitArgs),
    /// Write a sample CSV file for an import kind.
    Template(TemplateArgs),
    /// Import a CSV file of expenses or income.
    ///
    /// Columns are matched to fields automatically. Use --map, --manual and --unmap to correct
    /// the matching, and --dry-run to check a file without storing anything.
    Import(ImportArgs),
    /// List previous imports, newest first.
    History(HistoryArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where harvest data and configuration is held. Defaults to ~/harvestrackr
    #[arg(long, env = "HARVEST_HOME", default_value_t = default_harvest_home())]
    harvest_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, harvest_home: PathBuf) -> Self {
        Self {
            log_level,
            harvest_home: harvest_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn harvest_home(&self) -> &DisplayPath {
        &self.harvest_home
    }
}

/// Args for the `harvest init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The id of the farm that imported records belong to.
    #[arg(long)]
    farm_id: String,

    /// How many rows to store per database insert. Defaults to 50.
    #[arg(long)]
    batch_size: Option<usize>,
}

impl InitArgs {
    pub fn new(farm_id: impl Into<String>, batch_size: Option<usize>) -> Self {
        Self {
            farm_id: farm_id.into(),
            batch_size,
        }
    }

    pub fn farm_id(&self) -> &str {
        &self.farm_id
    }

    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }
}

/// Args for the `harvest template` command.
#[derive(Debug, Parser, Clone)]
pub struct TemplateArgs {
    /// The kind of import to write a template for.
    #[arg(value_enum)]
    kind: ImportKind,

    /// The directory to write `<kind>-import-template.csv` into. Defaults to the current directory.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

impl TemplateArgs {
    pub fn new(kind: ImportKind, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            out_dir: out_dir.into(),
        }
    }

    pub fn kind(&self) -> ImportKind {
        self.kind
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

/// Args for the `harvest import` command.
#[derive(Debug, Parser, Clone)]
pub struct ImportArgs {
    /// The kind of records in the file.
    #[arg(value_enum)]
    kind: ImportKind,

    /// The CSV file to import.
    file: PathBuf,

    /// Map a field to a column, e.g. --map vendor="Supplier Name". Repeatable.
    #[arg(long = "map", value_name = "FIELD=HEADER")]
    maps: Vec<Assignment>,

    /// Use a constant for a field on every row, e.g. --manual category=Feed. Repeatable.
    #[arg(long = "manual", value_name = "FIELD=VALUE")]
    manuals: Vec<Assignment>,

    /// Clear the detected column for a field. Repeatable.
    #[arg(long = "unmap", value_name = "FIELD")]
    unmaps: Vec<String>,

    /// Drop a row (1-based, as shown in the preview) before importing. Repeatable.
    #[arg(long = "remove-row", value_name = "ROW")]
    remove_rows: Vec<usize>,

    /// Drop every row that has a validation error before importing.
    #[arg(long)]
    skip_invalid: bool,

    /// Run every step but store nothing and record no history.
    #[arg(long)]
    dry_run: bool,
}

impl ImportArgs {
    pub fn new(kind: ImportKind, file: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            file: file.into(),
            maps: Vec::new(),
            manuals: Vec::new(),
            unmaps: Vec::new(),
            remove_rows: Vec::new(),
            skip_invalid: false,
            dry_run: false,
        }
    }

    pub fn with_map(mut self, map: Assignment) -> Self {
        self.maps.push(map);
        self
    }

    pub fn with_manual(mut self, manual: Assignment) -> Self {
        self.manuals.push(manual);
        self
    }

    pub fn with_unmap(mut self, key: impl Into<String>) -> Self {
        self.unmaps.push(key.into());
        self
    }

    pub fn with_removed_row(mut self, row: usize) -> Self {
        self.remove_rows.push(row);
        self
    }

    pub fn with_skip_invalid(mut self, skip_invalid: bool) -> Self {
        self.skip_invalid = skip_invalid;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn kind(&self) -> ImportKind {
        self.kind
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn maps(&self) -> &[Assignment] {
        &self.maps
    }

    pub fn manuals(&self) -> &[Assignment] {
        &self.manuals
    }

    pub fn unmaps(&self) -> &[String] {
        &self.unmaps
    }

    pub fn remove_rows(&self) -> &[usize] {
        &self.remove_rows
    }

    pub fn skip_invalid(&self) -> bool {
        self.skip_invalid
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Args for the `harvest history` command.
#[derive(Debug, Parser, Clone)]
pub struct HistoryArgs {
    /// Only list imports of this kind.
    #[arg(long, value_enum)]
    kind: Option<ImportKind>,

    /// The maximum number of entries to list.
    #[arg(long, default_value_t = 10)]
    limit: u32,
}

impl HistoryArgs {
    pub fn new(kind: Option<ImportKind>, limit: u32) -> Self {
        Self { kind, limit }
    }

    pub fn kind(&self) -> Option<ImportKind> {
        self.kind
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

fn default_harvest_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("harvestrackr"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --harvest-home or HARVEST_HOME instead of relying on the default \
                harvest home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("harvestrackr")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
