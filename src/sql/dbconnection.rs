use crate::value::Value;

#[cfg(feature = "sqlite")]
pub mod sqliteconn;

pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Parameters bound to one statement execution.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundParams {
    /// For `qmark`, `numeric` and `format` styles.
    Positional(Vec<Value>),
    /// For `named` and `pyformat` styles, keyed by field name.
    Named(Vec<(String, Value)>),
}

impl BoundParams {
    /// No parameters, as used for DDL.
    #[must_use]
    pub fn empty() -> Self {
        BoundParams::Positional(Vec::new())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            BoundParams::Positional(values) => values.len(),
            BoundParams::Named(pairs) => pairs.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values in binding order, regardless of style.
    pub fn values(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            BoundParams::Positional(values) => Box::new(values.iter()),
            BoundParams::Named(pairs) => Box::new(pairs.iter().map(|(_, value)| value)),
        }
    }
}

/// A driver connection the writer can open cursors on and commit.
///
/// The writer never closes the connection; the caller owns it.
pub trait DbConnection {
    /// Error reported by the driver when it rejects a statement. The writer
    /// treats these as backend failures, distinct from its own errors.
    type Error: std::error::Error + Send + Sync + 'static;

    type Cursor<'a>: Cursor<Error = Self::Error>
    where
        Self: 'a;

    /// The placeholder convention this driver expects, as a style tag
    /// (`qmark`, `numeric`, `named`, `format` or `pyformat`).
    fn param_style(&self) -> &str;

    /// Open a cursor on this connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot provide a cursor.
    fn cursor(&self) -> Result<Self::Cursor<'_>, Self::Error>;

    /// Commit the current transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    fn commit(&self) -> Result<(), Self::Error>;
}

pub trait Cursor {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Execute the given SQL statement with parameters.
    ///
    /// # Arguments
    ///
    /// * `sql` - The SQL statement.
    /// * `params` - The parameters for the SQL statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the execution fails.
    fn execute(&mut self, sql: &str, params: &BoundParams) -> Result<(), Self::Error>;

    /// Release the cursor. Later calls to `execute` fail.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to release the cursor.
    fn close(&mut self) -> Result<(), Self::Error>;
}
