/// Database Module
///
/// This module provides the database plumbing for usql, organized into
/// focused submodules.
///
/// ## Architecture
///
/// - **Connection Factory** (`connection.rs`): produces raw connections from
///   static credentials or an injected data source
/// - **Row Records** (`row.rs`): one decoded result row as an ordered
///   column-name-to-value mapping
/// - **Scoped Query Session** (`session.rs`): runs parameterized reads and
///   writes against one connection and manages its lifecycle
///
/// ## Error Handling
///
/// All database operations use `UsqlError`. Failures while releasing
/// resources are logged and never replace the primary outcome.
pub mod connection;
pub mod row;
pub mod session;

pub use connection::*;
pub use row::*;
pub use session::*;
