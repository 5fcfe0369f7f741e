/// Core Module for usql
///
/// This module contains the building blocks behind the `Sql` facade: the
/// connection factory, the scoped query session, row records and the
/// error taxonomy shared by all of them.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{BoxError, Result, UsqlError};
