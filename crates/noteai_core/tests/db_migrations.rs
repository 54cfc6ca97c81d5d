use noteai_core::db::migrations::latest_version;
use noteai_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "notes");
    assert_table_exists(&conn, "note_versions");
    assert_table_exists(&conn, "note_tags");
}

#[test]
fn note_status_column_rejects_unknown_values() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO notes (uuid, owner_uuid, content, created_at, updated_at)
         VALUES ('n1', 'o1', '', 0, 0);",
        [],
    )
    .unwrap();
    let status: String = conn
        .query_row("SELECT status FROM notes WHERE uuid = 'n1';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(status, "draft");

    let deleted = conn.execute("UPDATE notes SET status = 'deleted' WHERE uuid = 'n1';", []);
    assert!(deleted.is_err());
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noteai.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "note_versions");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
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
fn version_rows_reject_unknown_change_type_and_duplicate_versions() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO notes (uuid, owner_uuid, content, current_version, created_at, updated_at)
         VALUES ('n1', 'o1', '', 1, 0, 0);",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO note_versions (uuid, note_uuid, version, content, change_type, created_at)
         VALUES ('v1', 'n1', 1, 'a', 'manual', 0);",
        [],
    )
    .unwrap();

    let bad_type = conn.execute(
        "INSERT INTO note_versions (uuid, note_uuid, version, content, change_type, created_at)
         VALUES ('v2', 'n1', 2, 'b', 'merge', 0);",
        [],
    );
    assert!(bad_type.is_err());

    let duplicate = conn.execute(
        "INSERT INTO note_versions (uuid, note_uuid, version, content, change_type, created_at)
         VALUES ('v3', 'n1', 1, 'c', 'auto_save', 0);",
        [],
    );
    assert!(duplicate.is_err());
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
