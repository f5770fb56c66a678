//! The CSV import pipeline: parse, map, transform, validate and commit, plus the session state
//! machine that drives those stages and the sample template producer.
mod commit;
mod mapper;
mod parser;
mod session;
mod template;
mod transform;
mod validate;

pub use commit::{commit, Progress, DEFAULT_BATCH_SIZE};
pub use mapper::{detect_mappings, synonyms};
pub use parser::{parse, ParseError, ParsedCsv};
pub use session::{ImportSession, SessionError, Step};
pub use template::{generate_template, write_template};
pub use transform::{transform_row, transform_rows};
pub use validate::{rows_with_errors, validate};
