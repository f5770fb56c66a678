//! Writes transformed rows to storage in fixed-size batches.

use crate::model::{ImportKind, ImportResult, Record, TransformedRow};
use crate::sink::BatchSink;
use crate::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

/// The number of rows sent to storage per insert call unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Reported after each batch settles, whether it succeeded or failed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct Progress {
    /// 1-based number of the batch that just settled.
    pub batch: usize,
    pub batches: usize,
    /// Rows attempted so far, including this batch.
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// Rounded percentage of rows attempted.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.processed * 100 + self.total / 2) / self.total) as u8
    }
}

/// Inserts `rows` into `kind`'s collection, `batch_size` rows per call.
///
/// Batches are sent strictly one after another. A failed batch counts all of its rows as failed
/// and adds `"Batch N: <error>"` to the result's errors; the remaining batches are still sent.
/// A batch with a row whose totals overflow fails the same way without reaching the sink.
/// Nothing is retried and nothing is rolled back. A `batch_size` of zero is treated as one.
pub async fn commit<F>(
    sink: &mut (dyn BatchSink + Send),
    kind: ImportKind,
    rows: &[TransformedRow],
    batch_size: usize,
    mut on_progress: F,
) -> ImportResult
where
    F: FnMut(Progress),
{
    let total = rows.len();
    let batch_size = batch_size.max(1);
    let batches = total.div_ceil(batch_size);
    let collection = kind.collection();
    let mut successful = 0;
    let mut errors = Vec::new();
    let mut processed = 0;

    info!("Importing {total} {kind} rows into {collection} in {batches} batches");
    for (idx, chunk) in rows.chunks(batch_size).enumerate() {
        let batch = idx + 1;
        let outcome = match prepare_batch(kind, chunk) {
            Ok(records) => sink.insert_batch(collection, &records).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(count) => {
                debug!("Batch {batch}/{batches}: stored {count} of {} rows", chunk.len());
                successful += count.min(chunk.len());
            }
            Err(e) => {
                warn!("Batch {batch}/{batches} failed: {e:#}");
                errors.push(format!("Batch {batch}: {e:#}"));
            }
        }

        processed += chunk.len();
        on_progress(Progress {
            batch,
            batches,
            processed,
            total,
        });
    }

    let result = ImportResult::new(total, successful, errors);
    info!("{result}");
    result
}

/// A row that cannot be prepared fails its whole batch before anything is sent.
fn prepare_batch(kind: ImportKind, chunk: &[TransformedRow]) -> Result<Vec<Record>> {
    chunk.iter().map(|row| Record::prepare(kind, row)).collect()
}
