//! Batched, fault-tolerant row writer.
//!
//! A [`SqlTarget`] holds the configuration for one table. Each call to
//! [`SqlTarget::open`] starts a [`WriterSession`] that owns a cursor for its
//! lifetime. The first row written to a session fixes the INSERT statement and
//! per-column coercions, and optionally drops and creates the table. Every
//! `commit_threshold` rows the connection is committed, and once more when the
//! session closes.
//!
//! A row the backend rejects does not end the session: `write` returns
//! [`WriteOutcome::Skipped`] with the driver's message and the row, and the
//! next row is written as usual.
//!
//! ```rust,no_run
//! use sql_row_writer::{row, SqlTarget, WriterOptions};
//! # fn example<C: sql_row_writer::sql::dbconnection::DbConnection>(conn: &C) -> Result<(), sql_row_writer::writer::Error> {
//! let target = SqlTarget::try_new(conn, "access_log", WriterOptions::default().with_create_table(true))?;
//! target.scope(|session| {
//!     session.write(row![client = "10.0.0.1", status = 200])?;
//!     session.write(row![client = "10.0.0.2", status = 404])?;
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use snafu::prelude::*;

use crate::options::WriterOptions;
use crate::sql::dbconnection::{BoundParams, Cursor, DbConnection, GenericError};
use crate::sql::schema::{drop_table_statement, CreateTableBuilder, TableSchema};
use crate::sql::statement::{self, StatementPlan};
use crate::sql::type_map::{self, TypeMap};
use crate::value::Row;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("The commit threshold must be 1 or more, got {threshold}"))]
    InvalidCommitThreshold { threshold: usize },

    #[snafu(display("Invalid column type configuration: {source}"))]
    InvalidColumnTypes { source: type_map::Error },

    #[snafu(display("Unable to build the INSERT statement for {table_name}: {source}"))]
    UnableToBuildInsertStatement {
        table_name: String,
        source: statement::Error,
    },

    #[snafu(display("Unable to build the CREATE TABLE statement for {table_name}: {source}"))]
    UnableToBuildCreateStatement {
        table_name: String,
        source: type_map::Error,
    },

    #[snafu(display("Unable to open a cursor: {source}"))]
    UnableToOpenCursor { source: GenericError },

    #[snafu(display("Unable to drop table {table_name}: {source}"))]
    UnableToDropTable {
        table_name: String,
        source: GenericError,
    },

    #[snafu(display("Unable to create table {table_name}: {source}"))]
    UnableToCreateTable {
        table_name: String,
        source: GenericError,
    },

    #[snafu(display("Unable to commit: {source}"))]
    UnableToCommit { source: GenericError },

    #[snafu(display("Unable to close the cursor: {source}"))]
    UnableToCloseCursor { source: GenericError },

    #[snafu(display("Cannot derive a table layout from an empty row"))]
    EmptyRow,

    #[snafu(display("Rows must have the same number of elements: expected {expected}, got {actual}"))]
    RowWidthMismatch { expected: usize, actual: usize },

    #[snafu(display("The session writing to {table_name} was aborted by an earlier error"))]
    SessionAborted { table_name: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Whether the error ends the session. Shape errors only fail the call
    /// that raised them.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::EmptyRow | Error::RowWidthMismatch { .. })
    }
}

/// A row the backend refused to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWarning {
    /// The driver's error message.
    pub message: String,
    /// The rejected row, rendered as a tuple.
    pub row: String,
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} while inserting row {}", self.message, self.row)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Skipped(RowWarning),
}

impl WriteOutcome {
    #[must_use]
    pub fn is_inserted(&self) -> bool {
        matches!(self, WriteOutcome::Inserted)
    }
}

/// Totals of a [`SqlTarget::write_all`] load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Rows submitted to the cursor, accepted or not.
    pub rows_written: usize,
    pub warnings: Vec<RowWarning>,
}

/// Writer configuration for one table on one connection.
#[derive(Debug)]
pub struct SqlTarget<'c, C: DbConnection> {
    connection: &'c C,
    table_name: String,
    options: WriterOptions,
    type_map: TypeMap,
}

impl<'c, C: DbConnection> SqlTarget<'c, C> {
    /// # Errors
    ///
    /// Returns an error if the commit threshold is zero or a column type is
    /// blank.
    pub fn try_new(
        connection: &'c C,
        table_name: impl Into<String>,
        options: WriterOptions,
    ) -> Result<Self> {
        ensure!(
            options.commit_threshold >= 1,
            InvalidCommitThresholdSnafu {
                threshold: options.commit_threshold
            }
        );
        let type_map = TypeMap::try_new(&options.column_types).context(InvalidColumnTypesSnafu)?;

        Ok(Self {
            connection,
            table_name: table_name.into(),
            options,
            type_map,
        })
    }

    /// Replace the type map derived from the options, e.g. to give one IP
    /// family a different column type than the other.
    #[must_use]
    pub fn with_type_map(mut self, type_map: TypeMap) -> Self {
        self.type_map = type_map;
        self
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[must_use]
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    #[must_use]
    pub fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    /// Start a session, acquiring a cursor from the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot provide a cursor.
    pub fn open(&self) -> Result<WriterSession<'_, C>> {
        WriterSession::open(self)
    }

    /// Run `f` inside a session that is closed on every exit path.
    ///
    /// An error from `f` takes precedence over an error while closing, which
    /// is logged instead.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or of opening or closing the session.
    pub fn scope<'s, T, F>(&'s self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriterSession<'s, C>) -> Result<T>,
    {
        let mut session = self.open()?;
        let result = f(&mut session);
        let closed = session.close();
        match result {
            Ok(value) => closed.map(|()| value),
            Err(e) => {
                if let Err(close_error) = closed {
                    tracing::error!("Failed to close session after an error: {close_error}");
                }
                Err(e)
            }
        }
    }

    /// Write every row in one session.
    ///
    /// # Errors
    ///
    /// Returns the first error `write` reports, including shape errors.
    pub fn write_all<I>(&self, rows: I) -> Result<WriteSummary>
    where
        I: IntoIterator<Item = Row>,
    {
        self.scope(|session| {
            let mut warnings = Vec::new();
            for row in rows {
                if let WriteOutcome::Skipped(warning) = session.write(row)? {
                    warnings.push(warning);
                }
            }
            Ok(WriteSummary {
                rows_written: session.rows_written(),
                warnings,
            })
        })
    }
}

enum SessionState {
    AwaitingFirstRow,
    Inserting(StatementPlan),
    Aborted,
}

/// An open cursor on the target table.
///
/// Dropping a session closes it; use [`WriterSession::close`] to observe
/// errors from releasing the cursor or the final commit.
pub struct WriterSession<'a, C: DbConnection + 'a> {
    target: &'a SqlTarget<'a, C>,
    cursor: C::Cursor<'a>,
    state: SessionState,
    counter: usize,
    skipped: usize,
    released: bool,
}

impl<'a, C: DbConnection + 'a> WriterSession<'a, C> {
    fn open(target: &'a SqlTarget<'a, C>) -> Result<Self> {
        tracing::debug!("Opening session for {}", target.table_name);
        let cursor = target
            .connection
            .cursor()
            .boxed()
            .context(UnableToOpenCursorSnafu)?;

        Ok(Self {
            target,
            cursor,
            state: SessionState::AwaitingFirstRow,
            counter: 0,
            skipped: 0,
            released: false,
        })
    }

    /// Rows submitted to the cursor so far, accepted or rejected.
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.counter
    }

    /// Rows the backend rejected so far.
    #[must_use]
    pub fn rows_skipped(&self) -> usize {
        self.skipped
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self.state, SessionState::Aborted)
    }

    /// The INSERT statement, once the first row has fixed it.
    #[must_use]
    pub fn statement(&self) -> Option<&str> {
        match &self.state {
            SessionState::Inserting(plan) => Some(plan.sql()),
            _ => None,
        }
    }

    /// Insert one row.
    ///
    /// # Errors
    ///
    /// Shape errors ([`Error::EmptyRow`], [`Error::RowWidthMismatch`]) fail this
    /// call only. Any other error aborts the session.
    pub fn write(&mut self, row: Row) -> Result<WriteOutcome> {
        if matches!(self.state, SessionState::AwaitingFirstRow) {
            match self.prepare(&row) {
                Ok(plan) => self.state = SessionState::Inserting(plan),
                Err(e) => {
                    if e.is_fatal() {
                        self.state = SessionState::Aborted;
                    }
                    return Err(e);
                }
            }
        }

        let SessionState::Inserting(plan) = &self.state else {
            return SessionAbortedSnafu {
                table_name: self.target.table_name.as_str(),
            }
            .fail();
        };

        ensure!(
            row.len() == plan.width(),
            RowWidthMismatchSnafu {
                expected: plan.width(),
                actual: row.len(),
            }
        );

        let params = plan.bind(&row);
        let outcome = match self.cursor.execute(plan.sql(), &params) {
            Ok(()) => WriteOutcome::Inserted,
            Err(e) => {
                let warning = RowWarning {
                    message: e.to_string(),
                    row: row.to_string(),
                };
                tracing::warn!("{warning}");
                self.skipped += 1;
                WriteOutcome::Skipped(warning)
            }
        };

        self.counter += 1;
        if self.counter % self.target.options.commit_threshold == 0 {
            tracing::debug!("COMMIT after {} rows", self.counter);
            if let Err(e) = self.target.connection.commit() {
                self.state = SessionState::Aborted;
                return Err(Error::UnableToCommit { source: Box::new(e) });
            }
        }

        Ok(outcome)
    }

    /// Close the cursor and commit, reporting the first failure.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the cursor or the final commit fails. The
    /// commit is attempted even when releasing the cursor failed.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn prepare(&mut self, row: &Row) -> Result<StatementPlan> {
        ensure!(!row.is_empty(), EmptyRowSnafu);
        tracing::debug!("First row");

        let target = self.target;
        let table_name = &target.table_name;
        let plan = StatementPlan::try_new(
            table_name,
            row,
            target.connection.param_style(),
            &target.type_map,
        )
        .context(UnableToBuildInsertStatementSnafu { table_name })?;

        let create = if target.options.create_table {
            let schema = TableSchema::infer(row);
            let sql = CreateTableBuilder::new(&schema, table_name)
                .build(&target.type_map)
                .context(UnableToBuildCreateStatementSnafu { table_name })?;
            Some(sql)
        } else {
            None
        };

        if target.options.drop_table {
            self.drop_table()?;
        }
        if let Some(sql) = create {
            tracing::debug!("Creating table {table_name}");
            self.execute_ddl(&sql)
                .context(UnableToCreateTableSnafu { table_name })?;
        }

        Ok(plan)
    }

    fn drop_table(&mut self) -> Result<()> {
        let target = self.target;
        let table_name = &target.table_name;
        tracing::debug!("Dropping table {table_name}");
        match self.execute_ddl(&drop_table_statement(table_name)) {
            Ok(()) => Ok(()),
            Err(e) if target.options.ignore_drop_errors => {
                tracing::warn!("Ignoring failure to drop table {table_name}: {e}");
                Ok(())
            }
            Err(source) => Err(Error::UnableToDropTable {
                table_name: table_name.clone(),
                source,
            }),
        }
    }

    fn execute_ddl(&mut self, sql: &str) -> Result<(), GenericError> {
        tracing::debug!("{sql}");
        self.cursor.execute(sql, &BoundParams::empty())?;
        tracing::debug!("COMMIT");
        self.target.connection.commit()?;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        tracing::debug!("Closing cursor");
        let closed = self.cursor.close().boxed().context(UnableToCloseCursorSnafu);
        self.state = SessionState::AwaitingFirstRow;
        self.counter = 0;
        self.skipped = 0;
        tracing::debug!("COMMIT");
        let committed = self
            .target
            .connection
            .commit()
            .boxed()
            .context(UnableToCommitSnafu);

        closed.and(committed)
    }
}

impl<'a, C: DbConnection + 'a> Drop for WriterSession<'a, C> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::error!("Failed to close session for {}: {e}", self.target.table_name);
        }
    }
}
