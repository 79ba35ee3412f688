//! Error type for `magpie-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("schema error: {0}")]
  Schema(#[from] magpie_schema::Error),

  /// A reconciliation step failed with an error not known to be benign.
  #[error("{step} failed: {source}")]
  Step {
    step:   String,
    #[source]
    source: rusqlite::Error,
  },
}

impl Error {
  pub(crate) fn step(step: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Self {
    let step = step.into();
    move |source| Error::Step { step, source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
