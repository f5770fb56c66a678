//! Types that represent the core data model, such as `FieldSpec`, `ColumnMapping` and `Record`.
mod amount;
mod date;
mod field;
mod mapping;
mod record;
mod row;

pub use amount::{clean_numeric, Amount, AmountError};
pub use date::parse_date;
pub use field::{FieldSpec, FieldType, ImportKind};
pub use mapping::{Assignment, ColumnMapping, ManualValues, MappingError, MappingTarget, MANUAL};
pub use record::{
    group_by_vendor_date, ExpenseGroup, ExpenseLine, IncomeEntry, PaymentMethod, Record,
};
pub use row::{FieldValue, ImportResult, RawRow, TransformedRow, ValidationError};
