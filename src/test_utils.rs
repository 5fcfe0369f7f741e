/// # Test Utilities Module
///
/// Fixtures shared by the unit tests. Databases live in a temporary
/// directory so that the separate connections opened by each session see
/// the same data; the directory is removed when the fixture is dropped.

use crate::Sql;
use std::path::PathBuf;
use std::sync::Once;
use tempfile::TempDir;

/// Installs a test-writer subscriber once so `tracing` output shows up in
/// failing tests.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// File-backed test database with a `Sql` instance pointing at it.
pub struct TestDatabase {
    _dir: TempDir,
    pub path: PathBuf,
    pub sql: Sql,
}

impl TestDatabase {
    /// Creates an empty database file.
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("test.db");
        let sql = Sql::new(path.to_string_lossy(), "", "");
        TestDatabase {
            _dir: dir,
            path,
            sql,
        }
    }

    /// Creates a database with an empty `person(NAME)` table.
    pub fn with_person_table() -> Self {
        let db = TestDatabase::new();
        db.sql
            .query(|q| q.update("CREATE TABLE person(NAME VARCHAR(255))", &[]))
            .expect("failed to create person table");
        db
    }

    /// Counts the rows of `person` through a fresh connection.
    pub fn person_count(&self) -> i64 {
        let conn = rusqlite::Connection::open(&self.path).expect("failed to open test database");
        conn.query_row("SELECT COUNT(*) FROM person", [], |row| row.get(0))
            .expect("failed to count persons")
    }
}
