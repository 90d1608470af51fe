use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use snafu::prelude::*;

use super::dbconnection::BoundParams;
use super::schema::TableSchema;
use super::type_map::{self, TypeMap};
use crate::value::{Row, Value, ValueKind};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "Unsupported parameter style '{style}'. Expected one of: qmark, numeric, named, format, pyformat"
    ))]
    UnsupportedParamStyle { style: String },

    #[snafu(display("Unable to derive bindings for field '{field}': {source}"))]
    UnableToDeriveCoercion {
        field: String,
        source: type_map::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Placeholder convention declared by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamStyle {
    /// `?`
    Qmark,
    /// `:1`, `:2`, ...
    Numeric,
    /// `:name`
    Named,
    /// `%s`
    Format,
    /// `%(name)s`
    Pyformat,
}

impl ParamStyle {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamStyle::Qmark => "qmark",
            ParamStyle::Numeric => "numeric",
            ParamStyle::Named => "named",
            ParamStyle::Format => "format",
            ParamStyle::Pyformat => "pyformat",
        }
    }

    /// Placeholder for the field `name` at 1-based `position`.
    #[must_use]
    pub fn placeholder(self, position: usize, name: &str) -> String {
        match self {
            ParamStyle::Qmark => "?".to_string(),
            ParamStyle::Numeric => format!(":{position}"),
            ParamStyle::Named => format!(":{name}"),
            ParamStyle::Format => "%s".to_string(),
            ParamStyle::Pyformat => format!("%({name})s"),
        }
    }

    /// Named styles take their parameters as a mapping rather than a list.
    #[must_use]
    pub fn is_named(self) -> bool {
        matches!(self, ParamStyle::Named | ParamStyle::Pyformat)
    }
}

impl FromStr for ParamStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "qmark" => Ok(ParamStyle::Qmark),
            "numeric" => Ok(ParamStyle::Numeric),
            "named" => Ok(ParamStyle::Named),
            "format" => Ok(ParamStyle::Format),
            "pyformat" => Ok(ParamStyle::Pyformat),
            _ => UnsupportedParamStyleSnafu { style: s }.fail(),
        }
    }
}

impl fmt::Display for ParamStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversion applied to a column's value before it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Identity,
    /// IP values in integer form. Values that are not IP addresses pass through.
    Integer,
    Text,
}

impl Coercion {
    #[must_use]
    pub fn apply(self, value: Value) -> Value {
        match (self, value) {
            (_, Value::Null) => Value::Null,
            (Coercion::Identity, value) => value,
            (Coercion::Integer, value) => value.ip_to_integer().unwrap_or(value),
            (Coercion::Text, value) => value.to_text().map_or(Value::Null, Value::Text),
        }
    }
}

/// Per-column coercions for rows shaped like `row`.
///
/// IP-family columns bind as integers when their configured column type is an
/// integer type, as text otherwise. URLs always bind as text.
///
/// # Errors
///
/// Returns an error if an IP-family value's kind has no entry in `type_map`.
pub fn build_coercions(row: &Row, type_map: &TypeMap) -> Result<Vec<Coercion>> {
    row.fields()
        .map(|(field, value)| match value.kind() {
            Some(kind) if kind.is_ip_family() => {
                let as_integer = type_map
                    .binds_as_integer(kind)
                    .context(UnableToDeriveCoercionSnafu { field })?;
                Ok(if as_integer {
                    Coercion::Integer
                } else {
                    Coercion::Text
                })
            }
            Some(ValueKind::Url) => Ok(Coercion::Text),
            _ => Ok(Coercion::Identity),
        })
        .collect()
}

pub struct InsertBuilder<'a> {
    schema: &'a TableSchema,
    table_name: String,
}

impl<'a> InsertBuilder<'a> {
    #[must_use]
    pub fn new(schema: &'a TableSchema, table_name: &str) -> Self {
        Self {
            schema,
            table_name: table_name.to_string(),
        }
    }

    /// `INSERT INTO <table> VALUES (<placeholders>)`.
    #[must_use]
    pub fn build(&self, style: ParamStyle) -> String {
        let placeholders = self
            .schema
            .field_names()
            .into_iter()
            .enumerate()
            .map(|(i, name)| style.placeholder(i + 1, name))
            .join(", ");
        format!("INSERT INTO {} VALUES ({placeholders})", self.table_name)
    }
}

/// The INSERT statement and bindings fixed by the first row of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementPlan {
    sql: String,
    style: ParamStyle,
    schema: TableSchema,
    coercions: Vec<Coercion>,
}

impl StatementPlan {
    /// Derive the plan from the first row of a session.
    ///
    /// # Errors
    ///
    /// Returns an error if `param_style` is not a supported style tag, or a
    /// value kind in `row` has no column type in `type_map`.
    pub fn try_new(
        table_name: &str,
        row: &Row,
        param_style: &str,
        type_map: &TypeMap,
    ) -> Result<Self> {
        let style = param_style.parse::<ParamStyle>()?;
        for (field, value) in row.fields() {
            if let Some(kind) = value.kind() {
                type_map
                    .column_type(kind)
                    .context(UnableToDeriveCoercionSnafu { field })?;
            }
        }

        let schema = TableSchema::infer(row);
        let sql = InsertBuilder::new(&schema, table_name).build(style);
        tracing::debug!("{sql}");
        let coercions = build_coercions(row, type_map)?;

        Ok(Self {
            sql,
            style,
            schema,
            coercions,
        })
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn style(&self) -> ParamStyle {
        self.style
    }

    #[must_use]
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    #[must_use]
    pub fn coercions(&self) -> &[Coercion] {
        &self.coercions
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.coercions.len()
    }

    /// Coerce `row` into parameters for the plan's style. Named styles are
    /// keyed by the first row's field names.
    #[must_use]
    pub fn bind(&self, row: &Row) -> BoundParams {
        let values = self
            .coercions
            .iter()
            .zip(row.values())
            .map(|(coercion, value)| coercion.apply(value.clone()));

        if self.style.is_named() {
            BoundParams::Named(
                self.schema
                    .columns()
                    .iter()
                    .map(|column| column.name.clone())
                    .zip(values)
                    .collect(),
            )
        } else {
            BoundParams::Positional(values.collect())
        }
    }
}
