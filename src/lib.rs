//! Write rows of semantically typed values into a SQL table through any
//! driver that can hand out cursors and commit.
//!
//! See [`writer`] for the session lifecycle and [`options`] for configuration.

pub mod options;
pub mod sql;
pub mod util;
pub mod value;
pub mod writer;

pub use options::WriterOptions;
pub use sql::statement::ParamStyle;
pub use sql::type_map::{ColumnTypes, TypeMap};
pub use value::{Row, Value, ValueKind};
pub use writer::{RowWarning, SqlTarget, WriteOutcome, WriteSummary, WriterSession};
