use crate::model::ImportKind;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The value a mapping entry holds when the user supplies a constant instead of a CSV column.
pub const MANUAL: &str = "__MANUAL__";

#[derive(Default, Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MappingError(String);

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl StdError for MappingError {}

impl From<String> for MappingError {
    fn from(message: String) -> Self {
        MappingError(message)
    }
}

/// Where the value for one target field comes from.
#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MappingTarget {
    /// No source; the field is treated as missing downstream.
    #[default]
    Unmapped,
    /// The value comes from the CSV column with this header.
    Column(String),
    /// The value comes from the `ManualValues` entry for this field.
    Manual,
}

impl MappingTarget {
    pub fn is_unmapped(&self) -> bool {
        matches!(self, MappingTarget::Unmapped)
    }
}

impl Display for MappingTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingTarget::Unmapped => Ok(()),
            MappingTarget::Column(header) => f.write_str(header),
            MappingTarget::Manual => f.write_str(MANUAL),
        }
    }
}

impl From<&str> for MappingTarget {
    /// The empty string means unmapped and `__MANUAL__` means manual; anything else is a header.
    fn from(value: &str) -> Self {
        match value {
            "" => MappingTarget::Unmapped,
            MANUAL => MappingTarget::Manual,
            header => MappingTarget::Column(header.to_string()),
        }
    }
}

impl Serialize for MappingTarget {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Maps every field key of an import kind to a `MappingTarget`.
///
/// A `ColumnMapping` always holds exactly one entry per field of its kind, in field order. Keys
/// that do not belong to the kind are rejected by `set`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ColumnMapping {
    kind: ImportKind,
    entries: Vec<(&'static str, MappingTarget)>,
}

impl ColumnMapping {
    /// Creates a mapping with every field of `kind` unmapped.
    pub fn unmapped(kind: ImportKind) -> Self {
        Self {
            kind,
            entries: kind
                .fields()
                .iter()
                .map(|f| (f.key, MappingTarget::Unmapped))
                .collect(),
        }
    }

    pub fn kind(&self) -> ImportKind {
        self.kind
    }

    /// The target for `key`, or `None` if `key` is not a field of this kind.
    pub fn get(&self, key: &str) -> Option<&MappingTarget> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, t)| t)
    }

    /// Points `key` at `target`.
    ///
    /// # Errors
    /// - Returns an error if `key` is not a field of this mapping's import kind.
    pub fn set(&mut self, key: &str, target: MappingTarget) -> Result<(), MappingError> {
        let kind = self.kind;
        let entry = self
            .entries
            .iter_mut()
            .find(|(k, _)| *k == key)
            .ok_or_else(|| MappingError(format!("'{key}' is not a field of the {kind} import")))?;
        entry.1 = target;
        Ok(())
    }

    /// Iterates `(key, target)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &MappingTarget)> {
        self.entries.iter().map(|(k, t)| (*k, t))
    }

    /// The keys of required fields that have no source.
    pub fn unmapped_required(&self) -> Vec<&'static str> {
        self.kind
            .fields()
            .iter()
            .filter(|f| f.required)
            .filter(|f| self.get(f.key).map_or(true, MappingTarget::is_unmapped))
            .map(|f| f.key)
            .collect()
    }
}

impl Serialize for ColumnMapping {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, target) in &self.entries {
            map.serialize_entry(key, target)?;
        }
        map.end()
    }
}

/// Constant values, keyed by field key, used for fields mapped to `MappingTarget::Manual`.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManualValues(BTreeMap<String, String>);

impl ManualValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An assignment given on the command line as `key=value`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Assignment {
    pub key: String,
    pub value: String,
}

impl FromStr for Assignment {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| MappingError(format!("Expected 'key=value' but got '{s}'")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(MappingError(format!("Missing field key in '{s}'")));
        }
        Ok(Self {
            key: key.to_string(),
            value: value.trim().to_string(),
        })
    }
}
