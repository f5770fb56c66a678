//! Command handlers for the harvest CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod history;
mod import;
mod init;
mod template;

use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use history::history;
pub use import::{import, ImportReport};
pub use init::{init, InitReport};
pub use template::template;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data that can be printed or inspected by tests.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` carrying `structure`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}
