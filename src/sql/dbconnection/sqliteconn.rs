use std::path::Path;

use rusqlite::types::Value as SqliteValue;
use rusqlite::Connection;
use snafu::prelude::*;

use super::{BoundParams, Cursor, DbConnection};
use crate::sql::statement::ParamStyle;
use crate::value::Value;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Unable to open SQLite database: {source}"))]
    UnableToOpen { source: rusqlite::Error },

    #[snafu(display("Unable to execute statement: {source}"))]
    UnableToExecute { source: rusqlite::Error },

    #[snafu(display("Unable to commit: {source}"))]
    UnableToCommit { source: rusqlite::Error },

    #[snafu(display("Integer {value} is too large for a SQLite INTEGER"))]
    IntegerOutOfRange { value: String },

    #[snafu(display("The statement has no parameter named '{name}'"))]
    UnknownParameter { name: String },

    #[snafu(display("SQLite does not understand the '{style}' parameter style"))]
    UnsupportedParamStyle { style: ParamStyle },

    #[snafu(display("The cursor is closed"))]
    CursorClosed,
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// A [`DbConnection`] over a `rusqlite` connection.
///
/// Statements run inside an implicit transaction that the first statement
/// after a commit opens, so nothing is durable until [`DbConnection::commit`].
pub struct SqliteConnection {
    pub conn: Connection,
    param_style: ParamStyle,
}

impl SqliteConnection {
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        SqliteConnection {
            conn,
            param_style: ParamStyle::Qmark,
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).context(UnableToOpenSnafu)?;
        Ok(Self::new(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context(UnableToOpenSnafu)?;
        Ok(Self::new(conn))
    }

    /// Declare a different placeholder style. SQLite accepts `?`, `:1` and
    /// `:name` placeholders, but not the percent styles.
    pub fn with_param_style(mut self, style: ParamStyle) -> Result<Self> {
        ensure!(
            matches!(
                style,
                ParamStyle::Qmark | ParamStyle::Numeric | ParamStyle::Named
            ),
            UnsupportedParamStyleSnafu { style }
        );
        self.param_style = style;
        Ok(self)
    }
}

impl DbConnection for SqliteConnection {
    type Error = Error;
    type Cursor<'a> = SqliteCursor<'a>;

    fn param_style(&self) -> &str {
        self.param_style.as_str()
    }

    fn cursor(&self) -> Result<SqliteCursor<'_>> {
        Ok(SqliteCursor {
            conn: &self.conn,
            closed: false,
        })
    }

    fn commit(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("COMMIT")
                .context(UnableToCommitSnafu)?;
        }
        Ok(())
    }
}

pub struct SqliteCursor<'a> {
    conn: &'a Connection,
    closed: bool,
}

impl Cursor for SqliteCursor<'_> {
    type Error = Error;

    fn execute(&mut self, sql: &str, params: &BoundParams) -> Result<()> {
        ensure!(!self.closed, CursorClosedSnafu);

        if self.conn.is_autocommit() {
            self.conn
                .execute_batch("BEGIN")
                .context(UnableToExecuteSnafu)?;
        }

        let mut stmt = self.conn.prepare_cached(sql).context(UnableToExecuteSnafu)?;
        match params {
            BoundParams::Positional(values) => {
                for (i, value) in values.iter().enumerate() {
                    stmt.raw_bind_parameter(i + 1, to_sqlite_value(value)?)
                        .context(UnableToExecuteSnafu)?;
                }
            }
            BoundParams::Named(pairs) => {
                for (name, value) in pairs {
                    let index = stmt
                        .parameter_index(&format!(":{name}"))
                        .context(UnableToExecuteSnafu)?
                        .context(UnknownParameterSnafu { name })?;
                    stmt.raw_bind_parameter(index, to_sqlite_value(value)?)
                        .context(UnableToExecuteSnafu)?;
                }
            }
        }

        stmt.raw_execute().context(UnableToExecuteSnafu)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.conn.flush_prepared_statement_cache();
        Ok(())
    }
}

fn to_sqlite_value(value: &Value) -> Result<SqliteValue> {
    let value = match value {
        Value::Null => SqliteValue::Null,
        Value::Integer(i) => SqliteValue::Integer(*i),
        Value::BigInteger(big) => {
            let small = i64::try_from(big)
                .ok()
                .context(IntegerOutOfRangeSnafu {
                    value: big.to_string(),
                })?;
            SqliteValue::Integer(small)
        }
        Value::Fixed(x) => SqliteValue::Real(*x),
        other => SqliteValue::Text(other.to_text().unwrap_or_default()),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn count(conn: &SqliteConnection, table: &str) -> i64 {
        conn.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn statements_run_in_an_implicit_transaction() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        let mut cursor = conn.cursor().unwrap();
        cursor
            .execute("CREATE TABLE t (a INTEGER, b TEXT)", &BoundParams::empty())
            .unwrap();
        assert!(!conn.conn.is_autocommit());
        conn.commit().unwrap();
        assert!(conn.conn.is_autocommit());

        cursor
            .execute(
                "INSERT INTO t VALUES (?, ?)",
                &BoundParams::Positional(vec![Value::Integer(1), Value::from("x")]),
            )
            .unwrap();
        conn.commit().unwrap();
        assert_eq!(count(&conn, "t"), 1);
    }

    #[test]
    fn named_parameters_bind_by_name() {
        let conn = SqliteConnection::open_in_memory()
            .unwrap()
            .with_param_style(ParamStyle::Named)
            .unwrap();
        assert_eq!(conn.param_style(), "named");
        let mut cursor = conn.cursor().unwrap();
        cursor
            .execute("CREATE TABLE t (a INTEGER, b TEXT)", &BoundParams::empty())
            .unwrap();
        cursor
            .execute(
                "INSERT INTO t VALUES (:a, :b)",
                &BoundParams::Named(vec![
                    ("b".to_string(), Value::from("second")),
                    ("a".to_string(), Value::Integer(7)),
                ]),
            )
            .unwrap();
        let (a, b): (i64, String) = conn
            .conn
            .query_row("SELECT a, b FROM t", [], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap();
        assert_eq!((a, b.as_str()), (7, "second"));
    }

    #[test]
    fn percent_styles_are_rejected() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        assert!(matches!(
            conn.with_param_style(ParamStyle::Pyformat),
            Err(Error::UnsupportedParamStyle { .. })
        ));
    }

    #[test]
    fn wide_integers_are_driver_errors() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        let mut cursor = conn.cursor().unwrap();
        cursor
            .execute("CREATE TABLE t (a INTEGER)", &BoundParams::empty())
            .unwrap();
        let err = cursor
            .execute(
                "INSERT INTO t VALUES (?)",
                &BoundParams::Positional(vec![Value::BigInteger(BigInt::from(u128::MAX))]),
            )
            .unwrap_err();
        assert!(matches!(err, Error::IntegerOutOfRange { .. }));
    }

    #[test]
    fn closed_cursors_refuse_statements() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        let mut cursor = conn.cursor().unwrap();
        cursor.close().unwrap();
        let err = cursor
            .execute("CREATE TABLE t (a INTEGER)", &BoundParams::empty())
            .unwrap_err();
        assert!(matches!(err, Error::CursorClosed));
    }
}
