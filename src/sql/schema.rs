//! Table layout inferred from the first row of a session, and the DDL built
//! from it.
//!
//! Table and column names are emitted verbatim. No single quoting convention
//! works across `[SQL Server]`, `` `MySQL` `` and `"standard"` identifiers, so
//! callers that need quoting pass it in the table name themselves.

use itertools::Itertools;

use super::type_map::{self, TypeMap};
use crate::value::{Row, ValueKind};

/// One column of a [`TableSchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    /// `None` when the sample value was `NULL`.
    pub kind: Option<ValueKind>,
}

/// Field names and semantic kinds derived from a sample row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<ColumnSchema>,
}

impl TableSchema {
    #[must_use]
    pub fn infer(row: &Row) -> Self {
        let columns = row
            .fields()
            .map(|(name, value)| ColumnSchema {
                name,
                kind: value.kind(),
            })
            .collect();
        Self { columns }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

pub struct CreateTableBuilder<'a> {
    schema: &'a TableSchema,
    table_name: String,
}

impl<'a> CreateTableBuilder<'a> {
    #[must_use]
    pub fn new(schema: &'a TableSchema, table_name: &str) -> Self {
        Self {
            schema,
            table_name: table_name.to_string(),
        }
    }

    /// `CREATE TABLE <table> (<name> <type>, ...)` in row order.
    ///
    /// # Errors
    ///
    /// Returns an error if a column's kind has no entry in `type_map`, or the
    /// sample value for a column was `NULL`.
    pub fn build(&self, type_map: &TypeMap) -> type_map::Result<String> {
        let columns = self
            .schema
            .columns()
            .iter()
            .map(|column| {
                let kind = column.kind.ok_or_else(|| {
                    type_map::Error::UntypedNull {
                        field: column.name.clone(),
                    }
                })?;
                let column_type = type_map.column_type(kind)?;
                Ok(format!("{} {column_type}", column.name))
            })
            .collect::<type_map::Result<Vec<_>>>()?;

        Ok(format!(
            "CREATE TABLE {} ({})",
            self.table_name,
            columns.iter().join(", ")
        ))
    }
}

#[must_use]
pub fn drop_table_statement(table_name: &str) -> String {
    format!("DROP TABLE {table_name}")
}
