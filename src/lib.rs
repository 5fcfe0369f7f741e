// Core infrastructure modules
pub mod core;

pub mod config;
pub mod sql;

#[cfg(test)]
mod test_utils;

pub use crate::core::db::{ConnectionProvider, DataSource, DriverSettings, Row, Session};
pub use crate::core::{BoxError, Result, UsqlError};
pub use crate::sql::Sql;
pub use rusqlite::types::{ToSql, Value};
pub use rusqlite::{params, Connection};
