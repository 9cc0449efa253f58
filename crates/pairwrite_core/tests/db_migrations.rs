use pairwrite_core::db::migrations::latest_version;
use pairwrite_core::db::{connect, open_db, DbError};
use pairwrite_core::DbConfig;
use rusqlite::Connection;

#[test]
fn open_db_creates_file_and_applies_all_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("pairs.sqlite3"));

    let conn = open_db(&config).unwrap();

    assert!(config.path.exists());
    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "small_numbers");
    assert_table_exists(&conn, "large_numbers");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("pairs.sqlite3"));

    let conn_first = open_db(&config).unwrap();
    conn_first
        .execute(
            "INSERT INTO small_numbers (field_a, field_b) VALUES (1, 2);",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&config).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let rows: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM small_numbers;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("future.sqlite3"));

    let conn = Connection::open(&config.path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&config).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn connect_enables_foreign_keys_without_creating_files() {
    let dir = tempfile::tempdir().unwrap();
    let missing = DbConfig::new(dir.path().join("missing.sqlite3"));
    assert!(matches!(connect(&missing), Err(DbError::Sqlite(_))));
    assert!(!missing.path.exists());

    let config = DbConfig::new(dir.path().join("pairs.sqlite3"));
    drop(open_db(&config).unwrap());
    let conn = connect(&config).unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
