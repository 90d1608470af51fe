use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::sql::type_map::ColumnTypes;
use crate::util;

const COMMIT_PARAM: &str = "commit";
const CREATE_TABLE_PARAM: &str = "create_table";
const DROP_TABLE_PARAM: &str = "drop_table";
const IGNORE_DROP_ERRORS_PARAM: &str = "ignore_drop_errors";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Invalid value '{value}' for option '{key}': {source}"))]
    InvalidNumber {
        key: String,
        value: String,
        source: std::num::ParseIntError,
    },

    #[snafu(display("Invalid value '{value}' for option '{key}', expected true or false"))]
    InvalidBoolean { key: String, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Construction-time configuration of a writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Rows per commit. Must be 1 or more.
    pub commit_threshold: usize,
    /// Create the table from the first row's layout.
    pub create_table: bool,
    /// Drop the table before the first row is written.
    pub drop_table: bool,
    /// Log and swallow a failing `DROP TABLE` instead of aborting.
    pub ignore_drop_errors: bool,
    pub column_types: ColumnTypes,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            commit_threshold: 1000,
            create_table: false,
            drop_table: false,
            ignore_drop_errors: true,
            column_types: ColumnTypes::default(),
        }
    }
}

impl WriterOptions {
    #[must_use]
    pub fn with_commit_threshold(mut self, commit_threshold: usize) -> Self {
        self.commit_threshold = commit_threshold;
        self
    }

    #[must_use]
    pub fn with_create_table(mut self, create_table: bool) -> Self {
        self.create_table = create_table;
        self
    }

    #[must_use]
    pub fn with_drop_table(mut self, drop_table: bool) -> Self {
        self.drop_table = drop_table;
        self
    }

    #[must_use]
    pub fn with_ignore_drop_errors(mut self, ignore_drop_errors: bool) -> Self {
        self.ignore_drop_errors = ignore_drop_errors;
        self
    }

    #[must_use]
    pub fn with_column_types(mut self, column_types: ColumnTypes) -> Self {
        self.column_types = column_types;
        self
    }

    /// Build options from a string option map, as passed by table factories.
    ///
    /// Keys may carry an `sql_` prefix. Recognised keys are `commit`,
    /// `create_table`, `drop_table`, `ignore_drop_errors` and one
    /// `<category>_type` key per [`ColumnTypes`] field (`string_type`,
    /// `int_type`, ...). Other keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a recognised key has an unparsable value.
    pub fn from_options(options: &HashMap<String, String>) -> Result<Self> {
        let options = util::remove_prefix_from_hashmap_keys(options.clone(), "sql_");
        let mut parsed = Self::default();

        if let Some(value) = options.get(COMMIT_PARAM) {
            parsed.commit_threshold = value.trim().parse().context(InvalidNumberSnafu {
                key: COMMIT_PARAM,
                value: value.as_str(),
            })?;
        }
        if let Some(flag) = bool_option(&options, CREATE_TABLE_PARAM)? {
            parsed.create_table = flag;
        }
        if let Some(flag) = bool_option(&options, DROP_TABLE_PARAM)? {
            parsed.drop_table = flag;
        }
        if let Some(flag) = bool_option(&options, IGNORE_DROP_ERRORS_PARAM)? {
            parsed.ignore_drop_errors = flag;
        }

        let column_types = &mut parsed.column_types;
        let slots = [
            ("string_type", &mut column_types.string_type),
            ("int_type", &mut column_types.int_type),
            ("fixed_type", &mut column_types.fixed_type),
            ("date_type", &mut column_types.date_type),
            ("time_type", &mut column_types.time_type),
            ("timestamp_type", &mut column_types.timestamp_type),
            ("ip_type", &mut column_types.ip_type),
            ("hostname_type", &mut column_types.hostname_type),
            ("filename_type", &mut column_types.filename_type),
        ];
        for (key, slot) in slots {
            if let Some(value) = options.get(key) {
                slot.clone_from(value);
            }
        }

        Ok(parsed)
    }
}

fn bool_option(options: &HashMap<String, String>, key: &str) -> Result<Option<bool>> {
    options
        .get(key)
        .map(|value| {
            util::parse_bool_option(value).context(InvalidBooleanSnafu {
                key,
                value: value.as_str(),
            })
        })
        .transpose()
}
