use crate::args::HistoryArgs;
use crate::commands::Out;
use crate::db::ImportLog;
use crate::{Config, Result};
use std::fmt::Write;

/// Lists the farm's previous imports, newest first.
pub async fn history(config: &Config, args: &HistoryArgs) -> Result<Out<Vec<ImportLog>>> {
    let logs = config.db().import_history(args.kind(), args.limit()).await?;
    if logs.is_empty() {
        return Ok(Out::new("No imports found", logs));
    }

    let mut message = format!("{} imports:", logs.len());
    for log in &logs {
        let _ = write!(
            message,
            "\n  {}  {:<8}  {}  {}/{} rows  {}",
            log.created_at.format("%Y-%m-%d %H:%M"),
            log.kind,
            log.filename,
            log.successful,
            log.total,
            log.status
        );
    }
    Ok(Out::new(message, logs))
}
