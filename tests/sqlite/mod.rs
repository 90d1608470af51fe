use super::*;
use chrono::{NaiveDate, NaiveTime};
use rstest::rstest;
use sql_row_writer::sql::dbconnection::sqliteconn::SqliteConnection;
use sql_row_writer::writer::Error;
use sql_row_writer::{
    row, ColumnTypes, ParamStyle, Row, SqlTarget, Value, WriteOutcome, WriterOptions,
};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV4};

fn count_rows(conn: &rusqlite::Connection, table_name: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table_name}"), [], |row| {
        row.get(0)
    })
    .expect("table should be readable")
}

fn column_types(conn: &rusqlite::Connection, table_name: &str) -> Vec<(String, String)> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table_name})"))
        .expect("pragma should prepare");
    stmt.query_map([], |row| Ok((row.get(1)?, row.get(2)?)))
        .expect("pragma should run")
        .collect::<Result<_, _>>()
        .expect("pragma rows should decode")
}

fn access_log_rows() -> Vec<Row> {
    let day = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
    (0..25)
        .map(|i| {
            row![
                client = Ipv4Addr::new(10, 0, 0, i),
                day = day,
                at = NaiveTime::from_hms_opt(12, 0, u32::from(i)).expect("valid time"),
                host = Value::hostname("www.example.com"),
                path = format!("/page/{i}"),
                status = 200,
                seconds = 0.25,
            ]
        })
        .collect()
}

#[test]
fn creates_the_table_and_loads_every_row() {
    let _tracing = init_tracing(Some("integration=debug,info"));
    let conn = SqliteConnection::open_in_memory().expect("sqlite should open");
    let options = WriterOptions::default()
        .with_commit_threshold(10)
        .with_create_table(true);
    let target = SqlTarget::try_new(&conn, "access_log", options).expect("valid options");

    let summary = target
        .write_all(access_log_rows())
        .expect("rows should be written");

    assert_eq!(summary.rows_written, 25);
    assert!(summary.warnings.is_empty());
    assert!(conn.conn.is_autocommit(), "final commit should end the transaction");
    assert_eq!(count_rows(&conn.conn, "access_log"), 25);
    assert_eq!(
        column_types(&conn.conn, "access_log"),
        vec![
            ("client".to_string(), "VARCHAR(53)".to_string()),
            ("day".to_string(), "DATE".to_string()),
            ("at".to_string(), "TIME".to_string()),
            ("host".to_string(), "VARCHAR(255)".to_string()),
            ("path".to_string(), "VARCHAR(1000)".to_string()),
            ("status".to_string(), "INTEGER".to_string()),
            ("seconds".to_string(), "DOUBLE".to_string()),
        ]
    );

    let (client, day, path): (String, String, String) = conn
        .conn
        .query_row(
            "SELECT client, day, path FROM access_log WHERE status = 200 ORDER BY path LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("row should be readable");
    assert_eq!(client, "10.0.0.0");
    assert_eq!(day, "2024-03-01");
    assert_eq!(path, "/page/0");
}

#[rstest]
#[case(ParamStyle::Qmark)]
#[case(ParamStyle::Numeric)]
#[case(ParamStyle::Named)]
fn every_sqlite_placeholder_style_binds(#[case] style: ParamStyle) {
    let conn = SqliteConnection::open_in_memory()
        .and_then(|conn| conn.with_param_style(style))
        .expect("sqlite should open");
    let target = SqlTarget::try_new(
        &conn,
        "styles",
        WriterOptions::default().with_create_table(true),
    )
    .expect("valid options");

    target
        .write_all([row![name = "a", n = 1], row![name = "b", n = 2]])
        .expect("rows should be written");

    let total: i64 = conn
        .conn
        .query_row("SELECT SUM(n) FROM styles WHERE name IN ('a', 'b')", [], |row| {
            row.get(0)
        })
        .expect("sum should be readable");
    assert_eq!(total, 3);
}

#[test]
fn integer_ip_columns_store_addresses_as_numbers() {
    let _tracing = init_tracing(None);
    let conn = SqliteConnection::open_in_memory().expect("sqlite should open");
    let options = WriterOptions::default()
        .with_create_table(true)
        .with_column_types(ColumnTypes {
            ip_type: "INTEGER".to_string(),
            ..Default::default()
        });
    let target = SqlTarget::try_new(&conn, "peers", options).expect("valid options");

    let summary = target
        .write_all([
            row![SocketAddrV4::new(Ipv4Addr::new(0, 0, 1, 2), 443)],
            row![Ipv6Addr::LOCALHOST],
            row![Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)],
        ])
        .expect("load should finish");

    // the wide IPv6 address does not fit a SQLite INTEGER
    assert_eq!(summary.rows_written, 3);
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.warnings[0]
        .message
        .contains("too large for a SQLite INTEGER"));

    let mut stmt = conn
        .conn
        .prepare("SELECT field1 FROM peers ORDER BY field1")
        .expect("select should prepare");
    let stored: Vec<i64> = stmt
        .query_map([], |row| row.get(0))
        .expect("select should run")
        .collect::<Result<_, _>>()
        .expect("values should be integers");
    assert_eq!(stored, vec![1, 258]);
}

#[test]
fn constraint_violations_skip_the_row_and_keep_going() {
    let conn = SqliteConnection::open_in_memory().expect("sqlite should open");
    conn.conn
        .execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
        .expect("table should be created");
    let target = SqlTarget::try_new(
        &conn,
        "users",
        WriterOptions::default().with_commit_threshold(2),
    )
    .expect("valid options");

    let mut session = target.open().expect("session should open");
    assert!(session.write(row![1, "ann"]).unwrap().is_inserted());
    let outcome = session.write(row![1, "duplicate"]).unwrap();
    let WriteOutcome::Skipped(warning) = outcome else {
        panic!("duplicate key should be skipped");
    };
    assert!(warning.message.contains("UNIQUE constraint failed"));
    assert_eq!(warning.row, "(1, 'duplicate')");

    assert!(!session.write(row![2, Value::Null]).unwrap().is_inserted());
    assert!(session.write(row![3, "cy"]).unwrap().is_inserted());
    assert_eq!(session.rows_written(), 4);
    assert_eq!(session.rows_skipped(), 2);
    session.close().expect("session should close");

    assert_eq!(count_rows(&conn.conn, "users"), 2);
}

#[test]
fn drop_of_a_missing_table_is_ignored_by_default() {
    let conn = SqliteConnection::open_in_memory().expect("sqlite should open");
    let options = WriterOptions::default()
        .with_drop_table(true)
        .with_create_table(true);
    let target = SqlTarget::try_new(&conn, "fresh", options).expect("valid options");

    target.write_all([row![1.5]]).expect("load should succeed");
    target
        .write_all([row![2.5], row![3.5]])
        .expect("second load should replace the table");

    assert_eq!(count_rows(&conn.conn, "fresh"), 2);
}

#[test]
fn drop_of_a_missing_table_fails_when_not_ignored() {
    let conn = SqliteConnection::open_in_memory().expect("sqlite should open");
    let options = WriterOptions::default()
        .with_drop_table(true)
        .with_ignore_drop_errors(false);
    let target = SqlTarget::try_new(&conn, "missing", options).expect("valid options");

    let err = target.write_all([row![1]]).unwrap_err();
    assert!(matches!(err, Error::UnableToDropTable { .. }));
    assert!(err.to_string().contains("no such table"));
}

#[test]
fn width_mismatch_leaves_the_session_usable() {
    let conn = SqliteConnection::open_in_memory().expect("sqlite should open");
    let target = SqlTarget::try_new(
        &conn,
        "pairs",
        WriterOptions::default().with_create_table(true),
    )
    .expect("valid options");

    target
        .scope(|session| {
            session.write(row!["a", 1])?;
            assert!(matches!(
                session.write(row!["b"]),
                Err(Error::RowWidthMismatch {
                    expected: 2,
                    actual: 1
                })
            ));
            session.write(row!["c", 3])?;
            Ok(())
        })
        .expect("scope should finish");

    assert_eq!(count_rows(&conn.conn, "pairs"), 2);
}

#[test]
fn batches_become_visible_at_each_commit() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("batches.db");
    let conn = SqliteConnection::open(&path).expect("sqlite should open");
    let reader = rusqlite::Connection::open(&path).expect("reader should open");

    let options = WriterOptions::default()
        .with_commit_threshold(2)
        .with_create_table(true);
    let target = SqlTarget::try_new(&conn, "events", options).expect("valid options");
    let mut session = target.open().expect("session should open");

    for i in 0..3 {
        session.write(row![id = i]).expect("row should be written");
    }
    assert_eq!(count_rows(&reader, "events"), 2);

    session.close().expect("session should close");
    assert_eq!(count_rows(&reader, "events"), 3);
}
