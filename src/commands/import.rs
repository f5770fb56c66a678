use crate::args::ImportArgs;
use crate::commands::Out;
use crate::db::ImportLog;
use crate::import::{ImportSession, Progress};
use crate::model::{ColumnMapping, ImportKind, ImportResult, MappingTarget, ValidationError};
use crate::sink::{BatchSink, MemorySink};
use crate::{utils, Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// How many validation errors and batch errors are written to the log.
const SHOWN_ERRORS: usize = 10;

/// Everything `harvest import` decided and did.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub kind: ImportKind,
    pub file_name: String,
    pub mapping: ColumnMapping,
    /// Validation errors for the rows that were committed, numbered as committed.
    pub validation_errors: Vec<ValidationError>,
    pub result: ImportResult,
    pub dry_run: bool,
}

/// Imports the CSV file named in `args` into the farm's store.
///
/// Runs the session from upload to complete: columns are detected and then adjusted with the
/// `--unmap`, `--map` and `--manual` options in that order, rows are transformed and validated,
/// rows named by `--remove-row` are dropped (numbers refer to the preview before any removal),
/// and with `--skip-invalid` every row with a validation error is dropped too. Remaining
/// validation errors are reported but do not stop the import.
///
/// With `--dry-run` the rows are committed to an in-memory sink and no history is written.
pub async fn import(config: &Config, args: &ImportArgs) -> Result<Out<ImportReport>> {
    let file_name = display_name(args.file());
    let bytes = utils::read_bytes(args.file()).await?;

    let mut session = ImportSession::new(args.kind());
    session
        .upload(&file_name, &bytes)
        .with_context(|| format!("Unable to import {file_name}"))?;
    if let Some(parsed) = session.parsed() {
        for error in &parsed.errors {
            warn!("Skipped an unreadable line in {file_name}: {error}");
        }
    }

    apply_mapping_options(&mut session, args)?;
    log_mapping(&session);
    let mapping = session
        .mapping()
        .cloned()
        .unwrap_or_else(|| ColumnMapping::unmapped(args.kind()));

    session.proceed_to_preview()?;
    let mut removals: Vec<usize> = args.remove_rows().to_vec();
    removals.sort_unstable();
    removals.dedup();
    for row in removals.into_iter().rev() {
        session.remove_row(row)?;
        debug!("Removed row {row}");
    }
    if args.skip_invalid() {
        let removed = session.exclude_invalid_rows()?;
        if removed > 0 {
            info!("Skipping {removed} rows with validation errors");
        }
    }

    let validation_errors = session.validation_errors().to_vec();
    for error in validation_errors.iter().take(SHOWN_ERRORS) {
        warn!("{error}");
    }
    if validation_errors.len() > SHOWN_ERRORS {
        warn!(
            "...and {} more validation errors",
            validation_errors.len() - SHOWN_ERRORS
        );
    }

    let mut sink: Box<dyn BatchSink + Send> = if args.dry_run() {
        Box::new(MemorySink::new())
    } else {
        Box::new(config.db().clone())
    };
    let result = session
        .run_import(sink.as_mut(), config.batch_size(), report_progress)
        .await?;

    for error in result.display_errors(SHOWN_ERRORS) {
        warn!("{error}");
    }
    if !args.dry_run() {
        let log = ImportLog::new(config.farm_id(), args.kind(), &file_name, &result);
        config.db().log_import(&log).await?;
    }

    let prefix = if args.dry_run() { "Dry run: " } else { "" };
    let message = format!("{prefix}{result}");
    Ok(Out::new(
        message,
        ImportReport {
            kind: args.kind(),
            file_name,
            mapping,
            validation_errors,
            result,
            dry_run: args.dry_run(),
        },
    ))
}

fn apply_mapping_options(session: &mut ImportSession, args: &ImportArgs) -> Result<()> {
    for key in args.unmaps() {
        session.set_mapping(key, MappingTarget::Unmapped)?;
    }
    for map in args.maps() {
        let has_header = session
            .parsed()
            .is_some_and(|p| p.headers.iter().any(|h| h == &map.value));
        if !has_header {
            warn!(
                "The file has no column named '{}', '{}' will fall back to its manual value",
                map.value, map.key
            );
        }
        session.set_mapping(&map.key, MappingTarget::Column(map.value.clone()))?;
    }
    for manual in args.manuals() {
        session.set_mapping(&manual.key, MappingTarget::Manual)?;
        session.set_manual_value(&manual.key, &manual.value)?;
    }
    Ok(())
}

fn log_mapping(session: &ImportSession) {
    let Some(mapping) = session.mapping() else {
        return;
    };
    for (key, target) in mapping.iter() {
        match target {
            MappingTarget::Unmapped => debug!("{key}: (unmapped)"),
            MappingTarget::Column(header) => info!("{key} <- column '{header}'"),
            MappingTarget::Manual => info!(
                "{key} <- '{}'",
                session
                    .manual_values()
                    .and_then(|m| m.get(key))
                    .unwrap_or_default()
            ),
        }
    }
    for key in mapping.unmapped_required() {
        warn!("Required field '{key}' is not mapped, every row will fail validation for it");
    }
}

fn report_progress(progress: Progress) {
    info!(
        "Batch {}/{}: {} of {} rows processed ({}%)",
        progress.batch,
        progress.batches,
        progress.processed,
        progress.total,
        progress.percent()
    );
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
