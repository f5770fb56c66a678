//! The storage boundary used by the committer.
//!
//! Committing only needs to "insert this batch of records into that collection", so storage is
//! reached through the narrow `BatchSink` trait. `Db` implements it for the local SQLite store and
//! `MemorySink` implements it in memory.

mod memory;

use crate::model::Record;
use crate::Result;

pub use memory::MemorySink;

/// Inserts batches of records into named collections.
#[async_trait::async_trait]
pub trait BatchSink {
    /// Inserts `records` into `collection` and returns how many were stored.
    ///
    /// An implementation must either store the whole batch or none of it, and return an error in
    /// the latter case.
    async fn insert_batch(&mut self, collection: &str, records: &[Record]) -> Result<usize>;
}
