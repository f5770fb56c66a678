//! Implements the `BatchSink` trait using in-memory data.
//!
//! Note: this is compiled even in the "production" version of this app so that `--dry-run` can
//! exercise the whole commit path without touching the database.

use crate::model::Record;
use crate::sink::BatchSink;
use crate::Result;
use anyhow::bail;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// A `BatchSink` that keeps every stored batch in memory. Specific calls can be made to fail,
/// which is how partial-failure behavior is exercised.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    collections: BTreeMap<String, Vec<Record>>,
    calls: usize,
    fail_calls: BTreeSet<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `n`th call to `insert_batch` (1-based) fail without storing anything.
    pub fn fail_call(mut self, n: usize) -> Self {
        self.fail_calls.insert(n);
        self
    }

    /// The records stored in `collection`, in insertion order.
    pub fn records(&self, collection: &str) -> &[Record] {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The number of times `insert_batch` has been called.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

#[async_trait::async_trait]
impl BatchSink for MemorySink {
    async fn insert_batch(&mut self, collection: &str, records: &[Record]) -> Result<usize> {
        self.calls += 1;
        trace!(
            "insert_batch call {} into {collection} with {} records",
            self.calls,
            records.len()
        );
        if self.fail_calls.contains(&self.calls) {
            bail!("simulated failure inserting into {collection}");
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .extend_from_slice(records);
        Ok(records.len())
    }
}
