use crate::config::Config;
use crate::core::db::{ConnectionProvider, DataSource, DriverSettings, Session};
use crate::core::{Result, UsqlError};
use rusqlite::Connection;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Entry point of usql: a connection factory plus the query and
/// transaction wrappers built on top of it.
///
/// # Examples
///
/// ```no_run
/// use usql::{params, Sql};
///
/// let sql = Sql::new("app.db", "", "");
/// let inserted = sql.query(|q| q.update("INSERT INTO person(name) VALUES(?)", params!["Leni"]))?;
/// assert_eq!(inserted, 1);
/// # Ok::<(), usql::UsqlError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Sql {
    provider: ConnectionProvider,
}

impl Sql {
    /// Connects through the driver with static credentials.
    pub fn new(url: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Sql {
            provider: ConnectionProvider::Driver(DriverSettings::new(url, user, password)),
        }
    }

    /// Connects through an injected data source.
    pub fn from_data_source<D: DataSource + 'static>(source: D) -> Self {
        Sql {
            provider: ConnectionProvider::Pooled(Arc::new(source)),
        }
    }

    /// Builds a driver-backed instance from a loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let database = &config.database;
        let mut settings = DriverSettings::new(
            database.url.as_str(),
            database.user.clone().unwrap_or_default(),
            database.password.clone().unwrap_or_default(),
        );
        if let Some(sqlite) = &config.sqlite {
            settings.sqlite = sqlite.clone();
        }
        Sql {
            provider: ConnectionProvider::Driver(settings),
        }
    }

    /// Injects a data source. It takes precedence over any configured credentials.
    pub fn with_data_source<D: DataSource + 'static>(mut self, source: D) -> Self {
        self.provider = ConnectionProvider::Pooled(Arc::new(source));
        self
    }

    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }

    /// Opens a raw connection.
    ///
    /// # Errors
    ///
    /// Returns `UsqlError::Connection` if neither the driver nor the data
    /// source can produce one.
    pub fn connect(&self) -> Result<Connection> {
        self.provider.acquire()
    }

    /// Opens a session on a fresh connection.
    pub fn session(&self, tx: bool) -> Result<Session> {
        Session::new(self.connect()?, tx)
    }

    /// Runs a unit of work on a non-transactional session.
    ///
    /// Every operation of the session closes the connection, so the unit of
    /// work gets exactly one operation. Errors propagate unchanged: session
    /// failures arrive as `Query` or `Connection`, and errors raised by the
    /// unit of work itself keep their own variant (e.g. `Aborted`). Unlike
    /// `tx`, nothing is wrapped in `UsqlError::Transaction`.
    pub fn query<T, F>(&self, unit_of_work: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let mut session = self.session(false)?;
        unit_of_work(&mut session)
    }

    /// Runs a unit of work in a transaction that is never rolled back.
    ///
    /// When the unit of work fails its partial writes are still committed
    /// during cleanup, and the failure is returned as `UsqlError::Transaction`.
    pub fn tx<T, F>(&self, unit_of_work: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        self.tx_with_rollback(unit_of_work, |_| false)
    }

    /// Runs a unit of work in a transaction.
    ///
    /// On success the transaction is committed and the connection closed.
    /// On failure the transaction is rolled back if `should_rollback`
    /// accepts the error; then, whatever the decision, cleanup commits and
    /// closes the connection. Rollback and cleanup failures are logged and
    /// discarded; the original failure is returned wrapped in
    /// `UsqlError::Transaction`.
    pub fn tx_with_rollback<T, F, R>(&self, unit_of_work: F, should_rollback: R) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
        R: Fn(&UsqlError) -> bool,
    {
        let mut session = match self.session(true) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Transaction could not start");
                return Err(UsqlError::Transaction(Box::new(e)));
            }
        };

        match unit_of_work(&mut session) {
            Ok(value) => {
                let committed = session.commit();
                session.close();
                match committed {
                    Ok(()) => {
                        debug!("Transaction committed");
                        Ok(value)
                    }
                    Err(e) => Err(UsqlError::Transaction(Box::new(UsqlError::Query(e)))),
                }
            }
            Err(failure) => {
                warn!(error = %failure, "Unit of work failed");
                if should_rollback(&failure) {
                    debug!("Rolling back transaction");
                    if let Err(e) = session.rollback() {
                        error!(error = %e, "Rollback failed");
                    }
                }
                if let Err(e) = session.commit() {
                    error!(error = %e, "Commit during transaction cleanup failed");
                }
                session.close();
                Err(UsqlError::Transaction(Box::new(failure)))
            }
        }
    }
}
