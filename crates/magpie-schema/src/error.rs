//! Error types for `magpie-schema`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid identifier: {0:?}")]
  InvalidIdentifier(String),

  #[error("table {0:?} is declared more than once")]
  DuplicateTable(String),

  #[error("column {column:?} is declared more than once in table {table:?}")]
  DuplicateColumn { table: String, column: String },

  #[error("index {0:?} is declared more than once")]
  DuplicateIndex(String),

  #[error("unknown table: {0:?}")]
  UnknownTable(String),

  #[error("unknown column {column:?} in table {table:?}")]
  UnknownColumn { table: String, column: String },

  #[error("index {index:?} is attached to {owner:?} but targets {target:?}")]
  IndexTableMismatch {
    index:  String,
    owner:  String,
    target: String,
  },

  #[error("index {0:?} has no columns")]
  EmptyIndex(String),

  /// An identifier outside the declared schema reached the DDL builder.
  #[error("identifier {0:?} is not part of the declared schema")]
  NotAllowed(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
