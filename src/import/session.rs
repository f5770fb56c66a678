//! The import wizard as an explicit state machine.
//!
//! ```text
//! upload -> mapping -> preview -> importing -> complete
//!   ^--------'  ^--------'                         |
//!   ^----------------------------------------------'
//! ```
//!
//! Each edge is one method on `ImportSession`. Calling a method from the wrong step returns
//! `SessionError::InvalidTransition` and leaves the session unchanged.

use crate::import::{
    commit, detect_mappings, parse, rows_with_errors, transform_rows, validate, ParseError,
    ParsedCsv, Progress,
};
use crate::model::{
    ColumnMapping, ImportKind, ImportResult, ManualValues, MappingError, MappingTarget,
    TransformedRow, ValidationError,
};
use crate::sink::BatchSink;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use tracing::{debug, info};

/// The steps of an import session.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Upload,
    Mapping,
    Preview,
    Importing,
    Complete,
}

serde_plain::derive_display_from_serialize!(Step);

/// Reasons a session operation was refused.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SessionError {
    /// The operation is not an edge out of the current step.
    InvalidTransition { from: Step, action: &'static str },
    /// The uploaded file has no usable data rows.
    EmptyFile { errors: Vec<ParseError> },
    /// Every preview row was removed.
    NoRows,
    /// The referenced preview row does not exist.
    RowOutOfRange { row: usize, rows: usize },
    Mapping(MappingError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidTransition { from, action } => {
                write!(f, "Cannot {action} during the {from} step")
            }
            SessionError::EmptyFile { errors } if errors.is_empty() => {
                f.write_str("The file has no data rows")
            }
            SessionError::EmptyFile { errors } => write!(
                f,
                "The file has no readable data rows ({} unreadable lines, first at {})",
                errors.len(),
                errors[0]
            ),
            SessionError::NoRows => f.write_str("There are no rows to import"),
            SessionError::RowOutOfRange { row, rows } => {
                write!(f, "Row {row} does not exist, the preview has {rows} rows")
            }
            SessionError::Mapping(e) => Display::fmt(e, f),
        }
    }
}

impl StdError for SessionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SessionError::Mapping(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MappingError> for SessionError {
    fn from(e: MappingError) -> Self {
        SessionError::Mapping(e)
    }
}

type SessionResult<T> = std::result::Result<T, SessionError>;

/// Data held from the mapping step onward.
#[derive(Debug, Clone)]
struct Upload {
    file_name: String,
    parsed: ParsedCsv,
    mapping: ColumnMapping,
    manual: ManualValues,
}

/// Data held from the preview step onward.
#[derive(Debug, Clone)]
struct Preview {
    upload: Upload,
    rows: Vec<TransformedRow>,
    errors: Vec<ValidationError>,
}

impl Preview {
    /// Removes 1-based `row`, drops its errors and shifts later errors up by one.
    fn remove_row(&mut self, row: usize) -> SessionResult<TransformedRow> {
        if row == 0 || row > self.rows.len() {
            return Err(SessionError::RowOutOfRange {
                row,
                rows: self.rows.len(),
            });
        }
        let removed = self.rows.remove(row - 1);
        self.errors.retain(|e| e.row != row);
        for e in self.errors.iter_mut().filter(|e| e.row > row) {
            e.row -= 1;
        }
        Ok(removed)
    }
}

#[derive(Debug, Clone)]
enum State {
    Upload,
    Mapping(Upload),
    Preview(Preview),
    Importing(Preview),
    Complete { file_name: String, result: ImportResult },
}

impl State {
    fn step(&self) -> Step {
        match self {
            State::Upload => Step::Upload,
            State::Mapping(_) => Step::Mapping,
            State::Preview(_) => Step::Preview,
            State::Importing(_) => Step::Importing,
            State::Complete { .. } => Step::Complete,
        }
    }
}

/// One user's import of one file. Sessions share nothing with each other.
#[derive(Debug, Clone)]
pub struct ImportSession {
    kind: ImportKind,
    state: State,
}

impl ImportSession {
    pub fn new(kind: ImportKind) -> Self {
        Self {
            kind,
            state: State::Upload,
        }
    }

    pub fn kind(&self) -> ImportKind {
        self.kind
    }

    pub fn step(&self) -> Step {
        self.state.step()
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            from: self.step(),
            action,
        }
    }

    /// upload -> mapping: parses `bytes` and auto-detects the column mapping.
    ///
    /// A file with no usable rows leaves the session in `upload` and returns `EmptyFile` with
    /// whatever parse errors were found.
    pub fn upload(&mut self, file_name: impl Into<String>, bytes: &[u8]) -> SessionResult<()> {
        if !matches!(self.state, State::Upload) {
            return Err(self.invalid("upload a file"));
        }
        let parsed = parse(bytes);
        if parsed.rows.is_empty() {
            return Err(SessionError::EmptyFile {
                errors: parsed.errors,
            });
        }
        let mapping = detect_mappings(&parsed.headers, self.kind);
        let file_name = file_name.into();
        info!(
            "Loaded {} rows from {file_name} ({} unreadable lines)",
            parsed.rows.len(),
            parsed.errors.len()
        );
        self.state = State::Mapping(Upload {
            file_name,
            parsed,
            mapping,
            manual: ManualValues::new(),
        });
        Ok(())
    }

    /// Points a field at a source. Allowed only during `mapping`.
    pub fn set_mapping(&mut self, key: &str, target: MappingTarget) -> SessionResult<()> {
        match &mut self.state {
            State::Mapping(upload) => {
                debug!("Mapping field '{key}' to '{target}'");
                upload.mapping.set(key, target)?;
                Ok(())
            }
            _ => Err(self.invalid("change the column mapping")),
        }
    }

    /// Sets the constant used for a field mapped to `Manual`. Allowed only during `mapping`.
    pub fn set_manual_value(&mut self, key: &str, value: impl Into<String>) -> SessionResult<()> {
        let kind = self.kind;
        match &mut self.state {
            State::Mapping(upload) => {
                if kind.field(key).is_none() {
                    return Err(SessionError::Mapping(MappingError::from(format!(
                        "'{key}' is not a field of the {kind} import"
                    ))));
                }
                upload.manual.set(key, value);
                Ok(())
            }
            _ => Err(self.invalid("set a manual value")),
        }
    }

    /// mapping -> preview: transforms every row and validates the result.
    pub fn proceed_to_preview(&mut self) -> SessionResult<&[ValidationError]> {
        let upload = match &self.state {
            State::Mapping(upload) => upload.clone(),
            _ => return Err(self.invalid("preview the import")),
        };
        let rows = transform_rows(&upload.parsed.rows, &upload.mapping, &upload.manual);
        let errors = validate(&rows, self.kind);
        self.state = State::Preview(Preview {
            upload,
            rows,
            errors,
        });
        Ok(self.validation_errors())
    }

    /// preview -> mapping: discards the transformed rows and their errors.
    pub fn back_to_mapping(&mut self) -> SessionResult<()> {
        match std::mem::replace(&mut self.state, State::Upload) {
            State::Preview(preview) => {
                self.state = State::Mapping(preview.upload);
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.invalid("go back to mapping"))
            }
        }
    }

    /// mapping -> upload: discards the file.
    pub fn back_to_upload(&mut self) -> SessionResult<()> {
        match self.state {
            State::Mapping(_) => {
                self.state = State::Upload;
                Ok(())
            }
            _ => Err(self.invalid("go back to upload")),
        }
    }

    /// Removes a preview row (1-based). Errors for that row are dropped and errors for later
    /// rows are renumbered so they keep pointing at the same data.
    pub fn remove_row(&mut self, row: usize) -> SessionResult<TransformedRow> {
        match &mut self.state {
            State::Preview(preview) => preview.remove_row(row),
            _ => Err(self.invalid("remove a row")),
        }
    }

    /// Removes every preview row that has at least one validation error. Returns how many rows
    /// were removed.
    pub fn exclude_invalid_rows(&mut self) -> SessionResult<usize> {
        match &mut self.state {
            State::Preview(preview) => {
                let bad = rows_with_errors(&preview.errors);
                // Highest first so earlier removals do not shift later targets.
                for row in bad.iter().rev() {
                    preview.remove_row(*row)?;
                }
                Ok(bad.len())
            }
            _ => Err(self.invalid("exclude invalid rows")),
        }
    }

    /// preview -> importing. Refuses with `NoRows` (staying in preview) if every row was removed.
    pub fn start_import(&mut self) -> SessionResult<&[TransformedRow]> {
        match std::mem::replace(&mut self.state, State::Upload) {
            State::Preview(preview) if preview.rows.is_empty() => {
                self.state = State::Preview(preview);
                Err(SessionError::NoRows)
            }
            State::Preview(preview) => {
                self.state = State::Importing(preview);
                Ok(self.rows())
            }
            other => {
                self.state = other;
                Err(self.invalid("start the import"))
            }
        }
    }

    /// importing -> complete.
    pub fn finish_import(&mut self, result: ImportResult) -> SessionResult<()> {
        match std::mem::replace(&mut self.state, State::Upload) {
            State::Importing(preview) => {
                self.state = State::Complete {
                    file_name: preview.upload.file_name,
                    result,
                };
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.invalid("finish the import"))
            }
        }
    }

    /// preview -> importing -> complete, committing every remaining row through `sink`.
    ///
    /// There is no way to cancel once this starts: every batch is attempted exactly once.
    pub async fn run_import<F>(
        &mut self,
        sink: &mut (dyn BatchSink + Send),
        batch_size: usize,
        on_progress: F,
    ) -> SessionResult<ImportResult>
    where
        F: FnMut(Progress),
    {
        let kind = self.kind;
        let rows = self.start_import()?;
        let result = commit(sink, kind, rows, batch_size, on_progress).await;
        self.finish_import(result.clone())?;
        Ok(result)
    }

    /// complete -> upload: starts over with a clean session.
    pub fn reset(&mut self) -> SessionResult<()> {
        match self.state {
            State::Complete { .. } => {
                self.state = State::Upload;
                Ok(())
            }
            _ => Err(self.invalid("reset")),
        }
    }

    fn upload_data(&self) -> Option<&Upload> {
        match &self.state {
            State::Mapping(upload) => Some(upload),
            State::Preview(preview) | State::Importing(preview) => Some(&preview.upload),
            _ => None,
        }
    }

    /// The name of the uploaded file, from `mapping` through `complete`.
    pub fn file_name(&self) -> Option<&str> {
        match &self.state {
            State::Complete { file_name, .. } => Some(file_name),
            _ => self.upload_data().map(|u| u.file_name.as_str()),
        }
    }

    pub fn parsed(&self) -> Option<&ParsedCsv> {
        self.upload_data().map(|u| &u.parsed)
    }

    pub fn mapping(&self) -> Option<&ColumnMapping> {
        self.upload_data().map(|u| &u.mapping)
    }

    pub fn manual_values(&self) -> Option<&ManualValues> {
        self.upload_data().map(|u| &u.manual)
    }

    /// The transformed rows during `preview` and `importing`; empty otherwise.
    pub fn rows(&self) -> &[TransformedRow] {
        match &self.state {
            State::Preview(preview) | State::Importing(preview) => &preview.rows,
            _ => &[],
        }
    }

    /// The validation errors during `preview` and `importing`; empty otherwise.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match &self.state {
            State::Preview(preview) | State::Importing(preview) => &preview.errors,
            _ => &[],
        }
    }

    /// The commit outcome once the session is `complete`.
    pub fn result(&self) -> Option<&ImportResult> {
        match &self.state {
            State::Complete { result, .. } => Some(result),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::validate;
    use crate::sink::MemorySink;

    const EXPENSE_CSV: &str = "\
Date,Vendor,Category,Item,Unit Cost,Quantity,Notes
2024-01-15,Acme,Seeds,Corn Seed,25.00,10,spring
not-a-date,Acme,Seeds,Corn,10,1,
2024-01-16,,Seeds,Corn,5,2,
";

    fn in_preview() -> ImportSession {
        let mut session = ImportSession::new(ImportKind::Expenses);
        session.upload("expenses.csv", EXPENSE_CSV.as_bytes()).unwrap();
        session.proceed_to_preview().unwrap();
        session
    }

    #[test]
    fn test_end_to_end_validation() {
        let session = in_preview();
        assert_eq!(session.step(), Step::Preview);
        assert_eq!(session.rows().len(), 3);
        assert_eq!(
            session.validation_errors(),
            &[
                ValidationError::new(2, "date", "Invalid date format"),
                ValidationError::new(3, "vendor", "Vendor is required"),
            ]
        );
    }

    #[test]
    fn test_upload_with_no_rows_stays_in_upload() {
        let mut session = ImportSession::new(ImportKind::Income);
        let err = session.upload("empty.csv", b"Date,Item\n").unwrap_err();
        assert_eq!(err, SessionError::EmptyFile { errors: vec![] });
        assert_eq!(err.to_string(), "The file has no data rows");
        assert_eq!(session.step(), Step::Upload);

        let err = session.upload("bad.csv", b"Date,Item\n1,2,3\n").unwrap_err();
        assert!(matches!(err, SessionError::EmptyFile { ref errors } if errors.len() == 1));
        assert_eq!(session.step(), Step::Upload);
    }

    #[test]
    fn test_mapping_edits_only_during_mapping() {
        let mut session = ImportSession::new(ImportKind::Expenses);
        assert!(matches!(
            session.set_mapping("vendor", MappingTarget::Manual),
            Err(SessionError::InvalidTransition { from: Step::Upload, .. })
        ));
        session.upload("e.csv", EXPENSE_CSV.as_bytes()).unwrap();
        session.set_mapping("vendor", MappingTarget::Manual).unwrap();
        session.set_manual_value("vendor", "Co-op").unwrap();
        assert!(session.set_manual_value("price", "1").is_err());
        assert!(session.set_mapping("price", MappingTarget::Manual).is_err());

        session.proceed_to_preview().unwrap();
        assert!(session.rows().iter().all(|r| r.text("vendor") == "Co-op"));
        // Row 3 no longer misses a vendor.
        assert_eq!(session.validation_errors().len(), 1);
        assert!(session.set_mapping("vendor", MappingTarget::Unmapped).is_err());
    }

    #[test]
    fn test_back_transitions() {
        let mut session = in_preview();
        assert!(session.back_to_upload().is_err());
        assert_eq!(session.step(), Step::Preview);
        session.back_to_mapping().unwrap();
        assert_eq!(session.step(), Step::Mapping);
        assert!(session.validation_errors().is_empty());
        assert!(session.mapping().is_some());
        session.back_to_upload().unwrap();
        assert_eq!(session.step(), Step::Upload);
        assert!(session.file_name().is_none());
    }

    #[test]
    fn test_remove_row_renumbers_errors() {
        let mut session = in_preview();
        let removed = session.remove_row(1).unwrap();
        assert_eq!(removed.text("item"), "Corn Seed");
        assert_eq!(
            session.validation_errors(),
            &[
                ValidationError::new(1, "date", "Invalid date format"),
                ValidationError::new(2, "vendor", "Vendor is required"),
            ]
        );
        // Renumbered errors match a fresh validation of the remaining rows.
        assert_eq!(
            session.validation_errors(),
            validate(session.rows(), ImportKind::Expenses).as_slice()
        );

        session.remove_row(1).unwrap();
        assert_eq!(
            session.validation_errors(),
            &[ValidationError::new(1, "vendor", "Vendor is required")]
        );
        assert!(matches!(
            session.remove_row(5),
            Err(SessionError::RowOutOfRange { row: 5, rows: 1 })
        ));
    }

    #[test]
    fn test_exclude_invalid_rows() {
        let mut session = in_preview();
        assert_eq!(session.exclude_invalid_rows().unwrap(), 2);
        assert_eq!(session.rows().len(), 1);
        assert_eq!(session.rows()[0].text("item"), "Corn Seed");
        assert!(session.validation_errors().is_empty());
    }

    #[test]
    fn test_start_import_with_no_rows_is_refused() {
        let mut session = in_preview();
        for _ in 0..3 {
            session.remove_row(1).unwrap();
        }
        assert_eq!(session.start_import().unwrap_err(), SessionError::NoRows);
        assert_eq!(session.step(), Step::Preview);
    }

    #[test]
    fn test_importing_has_no_way_back() {
        let mut session = in_preview();
        session.start_import().unwrap();
        assert_eq!(session.step(), Step::Importing);
        assert!(session.back_to_mapping().is_err());
        assert!(session.back_to_upload().is_err());
        assert!(session.reset().is_err());
        assert!(session.remove_row(1).is_err());
        assert_eq!(session.step(), Step::Importing);
        assert_eq!(session.rows().len(), 3);

        session.finish_import(ImportResult::new(3, 3, vec![])).unwrap();
        assert_eq!(session.step(), Step::Complete);
        assert_eq!(session.file_name(), Some("expenses.csv"));
        session.reset().unwrap();
        assert_eq!(session.step(), Step::Upload);
    }

    #[test]
    fn test_finish_requires_importing() {
        let mut session = in_preview();
        assert!(session.finish_import(ImportResult::default()).is_err());
        assert_eq!(session.step(), Step::Preview);
    }

    #[tokio::test]
    async fn test_run_import() {
        let mut session = in_preview();
        let mut sink = MemorySink::new();
        let mut last = None;
        let result = session
            .run_import(&mut sink, 2, |p| last = Some(p))
            .await
            .unwrap();
        assert_eq!(result, ImportResult::new(3, 3, vec![]));
        assert_eq!(result.title(), "Import Complete");
        assert_eq!(sink.calls(), 2);
        assert_eq!(last.unwrap().percent(), 100);
        assert_eq!(session.step(), Step::Complete);
        assert_eq!(session.result(), Some(&result));
    }

    #[test]
    fn test_error_display() {
        let err = SessionError::InvalidTransition {
            from: Step::Importing,
            action: "go back to mapping",
        };
        assert_eq!(
            err.to_string(),
            "Cannot go back to mapping during the importing step"
        );
    }
}
