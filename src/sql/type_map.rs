use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::value::{Value, ValueKind};

/// Keywords that make a column type an integer type for coercion purposes.
const INTEGER_TYPE_PREFIXES: [&str; 6] = [
    "INT",
    "BIGINT",
    "SMALLINT",
    "TINYINT",
    "MEDIUMINT",
    "HUGEINT",
];

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("The column type configured for {kind} values is empty"))]
    EmptyColumnType { kind: ValueKind },

    #[snafu(display("No column type is mapped for {kind} values"))]
    UnmappedKind { kind: ValueKind },

    #[snafu(display(
        "Field '{field}' is NULL in the first row, so no column type can be inferred for it"
    ))]
    UntypedNull { field: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Column type strings per semantic category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnTypes {
    /// Used for text and URL values.
    pub string_type: String,
    pub int_type: String,
    pub fixed_type: String,
    pub date_type: String,
    pub time_type: String,
    pub timestamp_type: String,
    /// Used for every IP address kind, with or without port.
    pub ip_type: String,
    pub hostname_type: String,
    pub filename_type: String,
}

impl Default for ColumnTypes {
    fn default() -> Self {
        Self {
            string_type: "VARCHAR(1000)".to_string(),
            int_type: "INTEGER".to_string(),
            fixed_type: "DOUBLE".to_string(),
            date_type: "DATE".to_string(),
            time_type: "TIME".to_string(),
            timestamp_type: "TIMESTAMP".to_string(),
            ip_type: "VARCHAR(53)".to_string(),
            hostname_type: "VARCHAR(255)".to_string(),
            filename_type: "VARCHAR(260)".to_string(),
        }
    }
}

impl ColumnTypes {
    #[must_use]
    pub fn column_type(&self, kind: ValueKind) -> &str {
        match kind {
            ValueKind::Text | ValueKind::Url => &self.string_type,
            ValueKind::Integer => &self.int_type,
            ValueKind::Fixed => &self.fixed_type,
            ValueKind::Date => &self.date_type,
            ValueKind::Time => &self.time_type,
            ValueKind::Timestamp => &self.timestamp_type,
            ValueKind::Ipv4Address
            | ValueKind::Ipv6Address
            | ValueKind::Ipv4Port
            | ValueKind::Ipv6Port => &self.ip_type,
            ValueKind::Hostname => &self.hostname_type,
            ValueKind::Filename => &self.filename_type,
        }
    }
}

/// Immutable lookup from [`ValueKind`] to the column type used in DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMap {
    types: BTreeMap<ValueKind, String>,
}

impl TypeMap {
    /// Map every kind through `column_types`.
    ///
    /// # Errors
    ///
    /// Returns an error if any category is configured with a blank type.
    pub fn try_new(column_types: &ColumnTypes) -> Result<Self> {
        ValueKind::ALL
            .into_iter()
            .try_fold(Self::empty(), |map, kind| {
                map.with_kind(kind, column_types.column_type(kind))
            })
    }

    /// A map with no entries. Kinds not added with [`TypeMap::with_kind`]
    /// fail lookups.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    /// Override the column type of a single kind.
    ///
    /// # Errors
    ///
    /// Returns an error if `column_type` is blank.
    pub fn with_kind(mut self, kind: ValueKind, column_type: impl Into<String>) -> Result<Self> {
        let column_type = column_type.into().trim().to_string();
        ensure!(!column_type.is_empty(), EmptyColumnTypeSnafu { kind });
        self.types.insert(kind, column_type);
        Ok(self)
    }

    pub fn column_type(&self, kind: ValueKind) -> Result<&str> {
        self.types
            .get(&kind)
            .map(String::as_str)
            .context(UnmappedKindSnafu { kind })
    }

    /// Column type for the value observed in `field`.
    pub fn column_type_for(&self, field: &str, value: &Value) -> Result<&str> {
        let kind = value.kind().context(UntypedNullSnafu { field })?;
        self.column_type(kind)
    }

    /// Whether IP values of `kind` should be bound in integer form.
    pub fn binds_as_integer(&self, kind: ValueKind) -> Result<bool> {
        self.column_type(kind).map(is_integer_type)
    }
}

impl Default for TypeMap {
    fn default() -> Self {
        let types = ValueKind::ALL
            .into_iter()
            .map(|kind| (kind, ColumnTypes::default().column_type(kind).to_string()))
            .collect();
        Self { types }
    }
}

#[must_use]
pub fn is_integer_type(column_type: &str) -> bool {
    let upper = column_type.trim_start().to_ascii_uppercase();
    INTEGER_TYPE_PREFIXES
        .iter()
        .any(|prefix| upper.starts_with(prefix))
}
