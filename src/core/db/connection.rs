/// Connection Factory Module
///
/// This module produces raw database connections, either by opening the
/// configured URL through the driver or by asking an injected data source.

use crate::config::SqliteConfig;
use crate::core::{Result, UsqlError};
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// An external, already configured provider of connections (for example a
/// managed pool) that can be injected instead of static credentials.
pub trait DataSource: Send + Sync {
    /// Hands out one open connection.
    fn connection(&self) -> rusqlite::Result<Connection>;
}

impl<F> DataSource for F
where
    F: Fn() -> rusqlite::Result<Connection> + Send + Sync,
{
    fn connection(&self) -> rusqlite::Result<Connection> {
        self()
    }
}

/// Static connection settings for the driver path.
#[derive(Clone, Default)]
pub struct DriverSettings {
    /// Database path or `file:` URI; `jdbc:sqlite:` and `sqlite:` prefixes are accepted
    pub url: String,
    pub user: String,
    pub password: String,
    /// Options applied to every connection after it is opened
    pub sqlite: SqliteConfig,
}

impl DriverSettings {
    /// Creates settings from a URL and credentials.
    pub fn new(url: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        DriverSettings {
            url: url.into(),
            user: user.into(),
            password: password.into(),
            sqlite: SqliteConfig::default(),
        }
    }

    /// Returns the path or URI handed to SQLite, without any scheme prefix.
    pub fn database_path(&self) -> &str {
        let url = self.url.as_str();
        url.strip_prefix("jdbc:sqlite:")
            .or_else(|| url.strip_prefix("sqlite://"))
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url)
    }

    fn open(&self) -> Result<Connection> {
        let path = self.database_path();
        // SQLite has no authentication; credentials are only carried along.
        debug!(url = %path, user = %self.user, "Opening driver connection");

        let conn = Connection::open_with_flags(path, OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI)
            .map_err(UsqlError::Connection)?;
        apply_options(&conn, &self.sqlite).map_err(UsqlError::Connection)?;
        Ok(conn)
    }
}

impl fmt::Debug for DriverSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverSettings")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"***")
            .field("sqlite", &self.sqlite)
            .finish()
    }
}

/// Where connections come from.
#[derive(Clone)]
pub enum ConnectionProvider {
    /// Open the URL through the driver with static credentials
    Driver(DriverSettings),
    /// Ask an injected data source
    Pooled(Arc<dyn DataSource>),
}

impl ConnectionProvider {
    /// Produces one open connection.
    ///
    /// # Errors
    ///
    /// Returns `UsqlError::Connection` wrapping the driver error if no
    /// connection could be obtained. There is no retry.
    pub fn acquire(&self) -> Result<Connection> {
        match self {
            ConnectionProvider::Driver(settings) => settings.open(),
            ConnectionProvider::Pooled(source) => {
                debug!("Acquiring connection from data source");
                source.connection().map_err(UsqlError::Connection)
            }
        }
    }

    /// Returns `true` when connections come from an injected data source.
    pub fn is_pooled(&self) -> bool {
        matches!(self, ConnectionProvider::Pooled(_))
    }
}

impl fmt::Debug for ConnectionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionProvider::Driver(settings) => f.debug_tuple("Driver").field(settings).finish(),
            ConnectionProvider::Pooled(_) => f.write_str("Pooled(..)"),
        }
    }
}

fn apply_options(conn: &Connection, options: &SqliteConfig) -> rusqlite::Result<()> {
    if let Some(ms) = options.busy_timeout_ms {
        conn.busy_timeout(Duration::from_millis(ms))?;
    }
    if let Some(enabled) = options.foreign_keys {
        conn.pragma_update(None, "foreign_keys", enabled)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_driver_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driver.db");
        let provider = ConnectionProvider::Driver(DriverSettings::new(
            path.to_string_lossy(),
            "",
            "",
        ));

        let conn = provider.acquire().unwrap();
        conn.execute_batch("CREATE TABLE t(x INTEGER)").unwrap();
        assert!(path.exists());
        assert!(!provider.is_pooled());
    }

    #[test]
    fn test_scheme_prefixes_are_stripped() {
        assert_eq!(DriverSettings::new("jdbc:sqlite:a.db", "", "").database_path(), "a.db");
        assert_eq!(DriverSettings::new("sqlite://a.db", "", "").database_path(), "a.db");
        assert_eq!(DriverSettings::new("sqlite:a.db", "", "").database_path(), "a.db");
        assert_eq!(DriverSettings::new("file:a.db?mode=ro", "", "").database_path(), "file:a.db?mode=ro");
    }

    #[test]
    fn test_driver_options_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = DriverSettings::new(dir.path().join("fk.db").to_string_lossy(), "", "");
        settings.sqlite = SqliteConfig {
            busy_timeout_ms: Some(250),
            foreign_keys: Some(true),
        };

        let conn = ConnectionProvider::Driver(settings).acquire().unwrap();
        let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)).unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_driver_connection_error() {
        let provider = ConnectionProvider::Driver(DriverSettings::new(
            "/nonexistent/path/database.db",
            "",
            "",
        ));

        match provider.acquire() {
            Err(UsqlError::Connection(_)) => {}
            other => panic!("Expected Connection error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_pooled_connection() {
        let handed_out = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&handed_out);
        let provider = ConnectionProvider::Pooled(Arc::new(move || -> rusqlite::Result<Connection> {
            counter.fetch_add(1, Ordering::SeqCst);
            Connection::open_in_memory()
        }));

        provider.acquire().unwrap();
        provider.acquire().unwrap();
        assert_eq!(handed_out.load(Ordering::SeqCst), 2);
        assert!(provider.is_pooled());
    }

    #[test]
    fn test_pooled_connection_error() {
        let provider = ConnectionProvider::Pooled(Arc::new(|| -> rusqlite::Result<Connection> {
            Err(rusqlite::Error::InvalidPath("pool exhausted".into()))
        }));

        assert!(matches!(provider.acquire(), Err(UsqlError::Connection(_))));
    }

    #[test]
    fn test_debug_hides_password() {
        let settings = DriverSettings::new("a.db", "app", "secret");
        let rendered = format!("{:?}", ConnectionProvider::Driver(settings));
        assert!(rendered.contains("app"));
        assert!(!rendered.contains("secret"));
    }
}
