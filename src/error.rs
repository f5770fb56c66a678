//! The crate-wide error and result aliases.
//!
//! Pipeline stages never fail on bad input data (they report it instead), so `Error` is reserved
//! for I/O, configuration, storage and invalid session transitions.

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
