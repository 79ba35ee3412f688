//! Declarative schema model for the MagPie registration backend.
//!
//! Describes the tables, columns, indexes and seed rows the database must
//! contain, renders them as SQLite DDL, and diffs them against a live
//! snapshot. This crate performs no I/O; applying a plan is the job of
//! `magpie-store-sqlite`.

pub mod catalog;
pub mod ddl;
pub mod definition;
pub mod error;
pub mod live;
pub mod model;
pub mod plan;

pub use ddl::Ddl;
pub use definition::SchemaDefinition;
pub use error::{Error, Result};
pub use plan::{Step, SyncPlan, plan};
