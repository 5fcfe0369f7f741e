/// usql Error Module
///
/// This module defines the error taxonomy for usql. Every failure a caller
/// sees is exactly one `UsqlError`, and driver-level failures are always
/// carried as the error's source so the original cause stays attributable.
use thiserror::Error;

/// Boxed caller error, used for failures raised by user code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for all usql operations.
///
/// The three primary kinds mirror the lifecycle of a call:
/// - obtaining a connection (`Connection`)
/// - preparing, binding or executing a statement (`Query`)
/// - running a unit of work inside a transaction (`Transaction`)
///
/// The remaining variants cover session misuse, typed row access, caller
/// aborts and configuration loading.
#[derive(Error, Debug)]
pub enum UsqlError {
    /// The driver or the injected data source could not produce a connection
    #[error("Connection error: {0}")]
    Connection(#[source] rusqlite::Error),

    /// Statement preparation, parameter binding or execution failed
    #[error("Query error: {0}")]
    Query(#[source] rusqlite::Error),

    /// A unit of work run by `Sql::tx` failed; wraps the original cause
    #[error("Transaction error: {0}")]
    Transaction(#[source] Box<UsqlError>),

    /// The session's connection was already closed by a previous operation
    #[error("Session closed: a non-transactional session runs a single operation")]
    SessionClosed,

    /// A row record has no column with the requested name
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A column value could not be converted to the requested type
    #[error("Conversion error for column {column}: {source}")]
    Conversion {
        column: String,
        #[source]
        source: rusqlite::types::FromSqlError,
    },

    /// Failure raised by caller code from a unit of work or a row mapper
    #[error("Aborted: {0}")]
    Aborted(#[source] BoxError),

    /// Configuration parsing and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UsqlError {
    /// Wraps an arbitrary caller error so it can be returned from a unit of work.
    pub fn abort<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        UsqlError::Aborted(error.into())
    }

    /// Returns the original cause of a transaction failure, or `self` otherwise.
    pub fn root(&self) -> &UsqlError {
        match self {
            UsqlError::Transaction(inner) => inner.root(),
            other => other,
        }
    }
}

/// Type alias for Result to use UsqlError as the error type.
pub type Result<T> = std::result::Result<T, UsqlError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let conn_err = UsqlError::Connection(rusqlite::Error::InvalidPath("/nope".into()));
        assert!(conn_err.to_string().contains("Connection error"));

        let query_err = UsqlError::Query(rusqlite::Error::ExecuteReturnedResults);
        assert!(query_err.to_string().contains("Query error"));

        let config_err = UsqlError::Config("Invalid config".to_string());
        assert!(config_err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_transaction_wraps_original_cause() {
        let cause = UsqlError::Query(rusqlite::Error::ExecuteReturnedResults);
        let tx_err = UsqlError::Transaction(Box::new(cause));

        assert!(tx_err.to_string().starts_with("Transaction error: Query error"));
        assert!(matches!(tx_err.root(), UsqlError::Query(_)));

        let source = tx_err.source().expect("transaction error has a source");
        assert!(source.to_string().contains("Query error"));
    }

    #[test]
    fn test_abort_keeps_caller_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = UsqlError::abort(io_err);
        match &err {
            UsqlError::Aborted(inner) => assert_eq!(inner.to_string(), "boom"),
            _ => panic!("Expected Aborted error"),
        }

        let err = UsqlError::abort("plain message");
        assert_eq!(err.to_string(), "Aborted: plain message");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let usql_err: UsqlError = io_err.into();
        match usql_err {
            UsqlError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }
    }
}
