//! SQLite backend for MagPie: schema reconciliation and the connection
//! wrapper the server boots with.
//!
//! [`SchemaManager`] is synchronous and works on a borrowed
//! [`rusqlite::Connection`]. [`Database`] wraps [`tokio_rusqlite`] so the
//! same work runs off the async runtime.

mod conflict;
mod introspect;
mod manager;
mod report;
mod seed;
mod store;

pub mod error;

pub use conflict::{Conflict, RETRY_DELAY, classify};
pub use error::{Error, Result};
pub use introspect::introspect;
pub use manager::SchemaManager;
pub use report::{SyncReport, TypeMismatch};
pub use store::{Database, DatabaseConfig};
