/// Scoped Query Session Module
///
/// A `Session` wraps one connection for the duration of a logical
/// operation. Non-transactional sessions close their connection as soon as
/// their single operation completes; transactional sessions keep it open
/// in manual-commit mode until the surrounding unit of work finishes.

use crate::core::db::Row;
use crate::core::{Result, UsqlError};
use rusqlite::types::{ToSql, Value};
use rusqlite::{Batch, Connection, Statement};
use tracing::{debug, error};

/// Query session bound to a single connection.
#[derive(Debug)]
pub struct Session {
    conn: Option<Connection>,
    tx: bool,
}

impl Session {
    /// Wraps an open connection.
    ///
    /// A transactional session disables auto-commit right away by opening a
    /// transaction. If that fails the connection is closed and the error is
    /// returned as `UsqlError::Connection`.
    pub fn new(conn: Connection, tx: bool) -> Result<Self> {
        if tx {
            if let Err(e) = conn.execute_batch("BEGIN") {
                close_connection(conn);
                return Err(UsqlError::Connection(e));
            }
        }
        debug!(transactional = tx, "Session opened");
        Ok(Session { conn: Some(conn), tx })
    }

    pub fn is_transactional(&self) -> bool {
        self.tx
    }

    /// Returns `true` while the session still holds its connection.
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Gives direct access to the bound connection.
    pub fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(UsqlError::SessionClosed)
    }

    /// Fetches all rows of a query as row records.
    ///
    /// With parameters the statement is prepared and each parameter bound
    /// positionally in argument order. Without parameters the text runs as
    /// a plain statement batch, so DDL and multi-statement text is accepted;
    /// the rows of the last statement that produces a result are returned.
    ///
    /// # Errors
    ///
    /// Returns `UsqlError::Query` wrapping the driver error, after the
    /// session has released its resources.
    pub fn rows(&mut self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>> {
        let conn = self.conn.as_ref().ok_or(UsqlError::SessionClosed)?;
        debug!(sql = %sql, params = params.len(), "Fetching rows");

        let result = fetch_rows(conn, sql, params).map_err(UsqlError::Query);
        self.release();
        result
    }

    /// Fetches all rows and maps each one with `mapper`, preserving order.
    ///
    /// Errors returned by the mapper are passed through unchanged.
    pub fn rows_as<T, F>(&mut self, sql: &str, params: &[&dyn ToSql], mapper: F) -> Result<Vec<T>>
    where
        F: FnMut(Row) -> Result<T>,
    {
        self.rows(sql, params)?.into_iter().map(mapper).collect()
    }

    /// Executes a write and returns the number of affected rows.
    ///
    /// The statement is always prepared, even without parameters. Text
    /// holding more than one statement is rejected before anything runs.
    pub fn update(&mut self, sql: &str, params: &[&dyn ToSql]) -> Result<u64> {
        let conn = self.conn.as_ref().ok_or(UsqlError::SessionClosed)?;
        debug!(sql = %sql, params = params.len(), "Executing update");

        let result = prepare_single(conn, sql)
            .and_then(|mut stmt| stmt.execute(params))
            .map(|affected| affected as u64)
            .map_err(UsqlError::Query);
        self.release();
        result
    }

    /// Commits the open transaction, if any.
    pub(crate) fn commit(&mut self) -> rusqlite::Result<()> {
        match &self.conn {
            Some(conn) if !conn.is_autocommit() => conn.execute_batch("COMMIT"),
            _ => Ok(()),
        }
    }

    /// Rolls back the open transaction and starts a new one, so the
    /// connection stays in manual-commit mode. A transaction the unit of
    /// work already ended itself is not restored; nothing is reverted then.
    pub(crate) fn rollback(&mut self) -> rusqlite::Result<()> {
        if let Some(conn) = &self.conn {
            if !conn.is_autocommit() {
                conn.execute_batch("ROLLBACK")?;
            }
            conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    /// Closes the connection now. Close failures are logged.
    pub(crate) fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            close_connection(conn);
        }
    }

    fn release(&mut self) {
        if !self.tx {
            self.close();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.conn.is_some() {
            debug!(transactional = self.tx, "Closing connection of dropped session");
            self.close();
        }
    }
}

fn close_connection(conn: Connection) {
    if let Err((_conn, e)) = conn.close() {
        error!(error = %e, "Failed to close connection");
    }
}

fn fetch_rows(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> rusqlite::Result<Vec<Row>> {
    if !params.is_empty() {
        let mut stmt = prepare_single(conn, sql)?;
        return collect_rows(&mut stmt, params);
    }

    let mut batch = Batch::new(conn, sql);
    let mut rows = Vec::new();
    while let Some(mut stmt) = batch.next()? {
        let collected = collect_rows(&mut stmt, &[])?;
        if stmt.column_count() > 0 {
            rows = collected;
        }
    }
    Ok(rows)
}

/// Prepares exactly one statement, failing with `MultipleStatement` when
/// more non-empty SQL follows it.
fn prepare_single<'conn>(conn: &'conn Connection, sql: &str) -> rusqlite::Result<Statement<'conn>> {
    let mut batch = Batch::new(conn, sql);
    let stmt = match batch.next()? {
        Some(stmt) => stmt,
        None => return conn.prepare(sql),
    };
    if batch.next()?.is_some() {
        return Err(rusqlite::Error::MultipleStatement);
    }
    Ok(stmt)
}

fn collect_rows(stmt: &mut Statement<'_>, params: &[&dyn ToSql]) -> rusqlite::Result<Vec<Row>> {
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut cursor = stmt.query(params)?;
    let mut rows = Vec::new();
    while let Some(raw) = cursor.next()? {
        let mut row = Row::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            row.insert(name.as_str(), Value::from(raw.get_ref(i)?));
        }
        rows.push(row);
    }
    Ok(rows)
}
