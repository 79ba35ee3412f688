//! Baseline rows that must exist after every reconciliation.

use magpie_schema::Ddl;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::{Error, Result};

/// Insert each declared seed row whose key is absent. Returns how many rows
/// were inserted; existing rows are never touched.
pub fn seed_defaults(conn: &Connection, ddl: &Ddl<'_>) -> Result<usize> {
  let mut inserted = 0;

  for seed in ddl.schema().seeds() {
    let step = format!("seed {}.{}={:?}", seed.table, seed.key_column, seed.key_value);

    let present: i64 = conn
      .query_row(&ddl.seed_exists(seed)?, [&seed.key_value], |row| row.get(0))
      .map_err(Error::step(step.clone()))?;
    if present > 0 {
      debug!(table = %seed.table, key = %seed.key_value, "default row present");
      continue;
    }

    info!(table = %seed.table, key = %seed.key_value, "inserting default row");
    conn
      .execute(&ddl.seed_insert(seed)?, rusqlite::params_from_iter(seed.params()))
      .map_err(Error::step(step))?;
    inserted += 1;
  }

  Ok(inserted)
}
