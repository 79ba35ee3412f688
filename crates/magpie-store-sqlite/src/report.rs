//! Outcome of one reconciliation pass.

use chrono::{DateTime, Utc};
use magpie_schema::model::ColumnType;
use serde::Serialize;

/// A live column whose declared type differs from the target. Reported and
/// left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMismatch {
  pub table:    String,
  pub column:   String,
  pub expected: ColumnType,
  pub found:    String,
}

/// What [`SchemaManager::sync_schema`](crate::SchemaManager::sync_schema)
/// changed. Object names are `table` or `table.column`.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
  /// Fingerprint of the declared schema the pass reconciled against.
  pub fingerprint:         String,
  pub tables_created:      Vec<String>,
  pub columns_added:       Vec<String>,
  pub columns_backfilled:  Vec<String>,
  pub indexes_created:     Vec<String>,
  pub type_mismatches:     Vec<TypeMismatch>,
  /// Statements skipped because a racing writer had already applied them
  /// or kept the resource locked past the retry.
  pub conflicts_tolerated: Vec<String>,
  pub rows_seeded:         usize,
  pub orphan_tables:       Vec<String>,
  pub finished_at:         DateTime<Utc>,
}

impl SyncReport {
  pub(crate) fn new(fingerprint: String) -> Self {
    Self {
      fingerprint,
      tables_created: Vec::new(),
      columns_added: Vec::new(),
      columns_backfilled: Vec::new(),
      indexes_created: Vec::new(),
      type_mismatches: Vec::new(),
      conflicts_tolerated: Vec::new(),
      rows_seeded: 0,
      orphan_tables: Vec::new(),
      finished_at: Utc::now(),
    }
  }

  /// True when the pass did not write anything.
  pub fn is_noop(&self) -> bool {
    self.tables_created.is_empty()
      && self.columns_added.is_empty()
      && self.columns_backfilled.is_empty()
      && self.indexes_created.is_empty()
      && self.rows_seeded == 0
  }
}
