//! Import farm expense and income CSV files into a local HarvesTrackr store.
//!
//! The pipeline lives in [`import`]: a file is parsed, its columns are matched to the fields of an
//! [`model::ImportKind`], rows are transformed and validated, and the result is committed in
//! batches to a [`sink::BatchSink`]. [`import::ImportSession`] drives those stages as a state
//! machine. [`Db`] is the SQLite-backed sink and also keeps the import history.

pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
pub mod import;
pub mod model;
pub mod sink;
mod utils;

#[cfg(test)]
mod test;

pub use config::Config;
pub use db::{Db, ImportLog, ImportStatus};
pub use error::Error;
pub use error::Result;
