//! [`SchemaManager`] reconciles a live SQLite database with a declared
//! [`SchemaDefinition`].
//!
//! There is no migration history. Every pass introspects the database,
//! plans the difference, and applies it:
//!
//! 1. missing tables are created with all columns, constraints and foreign
//!    keys;
//! 2. missing columns are added to existing tables, then back-filled where
//!    pre-existing rows would otherwise be NULL;
//! 3. missing indexes are created;
//! 4. seed rows are inserted if absent;
//! 5. the whole pass commits as one transaction.
//!
//! Nothing is ever dropped, renamed or retyped. A column whose live type
//! differs from the declared one is logged and left alone.

use std::{thread, time::Duration};

use magpie_schema::{
  Ddl, SchemaDefinition, Step, SyncPlan,
  model::{ColumnSpec, IndexSpec, TableSpec},
  plan,
};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  conflict::{Conflict, Outcome, RETRY_DELAY, classify, execute_tolerant},
  introspect::introspect,
  report::{SyncReport, TypeMismatch},
  seed::seed_defaults,
};

const BEGIN_STEP: &str = "begin reconciliation";

/// Reconciler over a borrowed connection.
pub struct SchemaManager<'c, 's> {
  conn:        &'c mut Connection,
  schema:      &'s SchemaDefinition,
  retry_delay: Duration,
}

impl<'c, 's> SchemaManager<'c, 's> {
  pub fn new(conn: &'c mut Connection, schema: &'s SchemaDefinition) -> Self {
    Self {
      conn,
      schema,
      retry_delay: RETRY_DELAY,
    }
  }

  /// Override the pause before retrying a conflicting statement.
  pub fn with_retry_delay(mut self, delay: Duration) -> Self {
    self.retry_delay = delay;
    self
  }

  /// Compute what [`SchemaManager::sync_schema`] would do, without writing.
  pub fn plan(&self) -> Result<SyncPlan<'s>> {
    let live = introspect(&*self.conn)?;
    Ok(plan(self.schema, &live))
  }

  /// Bring the database in line with the declared schema.
  ///
  /// The pass runs inside an `IMMEDIATE` transaction, so a second process
  /// booting at the same time waits (up to the connection's busy timeout)
  /// and then introspects the already-migrated schema. If the lock is still
  /// held after that wait, taking it is retried once after the retry delay.
  /// Running this on a conformant database writes nothing.
  pub fn sync_schema(&mut self) -> Result<SyncReport> {
    let schema = self.schema;
    let ddl = Ddl::new(schema);
    let mut report = SyncReport::new(schema.fingerprint());

    info!(fingerprint = %report.fingerprint, "syncing database schema");

    // `Transaction::new_unchecked` is what `transaction_with_behavior` calls;
    // taking a shared borrow lets the retry arm borrow the connection again.
    let conn: &Connection = self.conn;
    let tx = match Transaction::new_unchecked(conn, TransactionBehavior::Immediate) {
      Ok(tx) => tx,
      Err(first) if classify(&first) == Conflict::Transient => {
        warn!(error = %first, "database is held by another writer, retrying once");
        thread::sleep(self.retry_delay);
        Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
          .map_err(Error::step(BEGIN_STEP))?
      }
      Err(other) => return Err(Error::step(BEGIN_STEP)(other)),
    };

    let live = introspect(&tx)?;
    debug!(
      tables = live.tables.len(),
      indexes = live.indexes.len(),
      "introspected live schema"
    );

    let plan = plan(schema, &live);
    for step in &plan.steps {
      match step {
        Step::CreateTable { table } => create_table(&tx, &ddl, table, &mut report)?,
        Step::AddColumn { table, column } => {
          add_column(&tx, &ddl, table, column, self.retry_delay, &mut report)?
        }
        Step::TypeMismatch {
          table,
          column,
          expected,
          found,
        } => {
          warn!(
            table,
            column,
            expected = expected.as_sql(),
            found = %found,
            "column type mismatch, leaving existing column unchanged"
          );
          report.type_mismatches.push(TypeMismatch {
            table:    (*table).to_owned(),
            column:   (*column).to_owned(),
            expected: *expected,
            found:    found.clone(),
          });
        }
        Step::CreateIndex { index } => {
          create_index(&tx, &ddl, index, self.retry_delay, &mut report)?
        }
      }
    }

    for table in &plan.orphan_tables {
      info!(table = %table, "table is not declared, leaving it in place");
    }
    report.orphan_tables = plan.orphan_tables;

    report.rows_seeded = seed_defaults(&tx, &ddl)?;

    tx.commit()?;
    report.finished_at = chrono::Utc::now();

    info!(
      tables_created = report.tables_created.len(),
      columns_added = report.columns_added.len(),
      indexes_created = report.indexes_created.len(),
      rows_seeded = report.rows_seeded,
      "database schema sync completed"
    );
    Ok(report)
  }
}

fn create_table(
  conn: &Connection,
  ddl: &Ddl<'_>,
  table: &TableSpec,
  report: &mut SyncReport,
) -> Result<()> {
  info!(table = %table.name, "creating table");
  let sql = ddl.create_table(table)?;
  conn
    .execute(&sql, [])
    .map_err(Error::step(format!("create table {}", table.name)))?;
  report.tables_created.push(table.name.clone());
  Ok(())
}

fn add_column(
  conn: &Connection,
  ddl: &Ddl<'_>,
  table: &str,
  column: &ColumnSpec,
  retry_delay: Duration,
  report: &mut SyncReport,
) -> Result<()> {
  let qualified = format!("{table}.{}", column.name);
  info!(table, column = %column.name, "adding column");

  let sql = ddl.add_column(table, column)?;
  let outcome = execute_tolerant(conn, &sql, retry_delay)
    .map_err(Error::step(format!("add column {qualified}")))?;

  match outcome {
    Outcome::Applied | Outcome::AppliedOnRetry => {}
    Outcome::AlreadyPresent => {
      info!(table, column = %column.name, "column already exists");
      report.conflicts_tolerated.push(qualified);
      return Ok(());
    }
    Outcome::GaveUp => {
      warn!(
        table,
        column = %column.name,
        "could not add column due to a write conflict, it may already exist"
      );
      report.conflicts_tolerated.push(qualified);
      return Ok(());
    }
  }
  report.columns_added.push(qualified.clone());

  if let Some(update) = ddl.backfill(table, column)? {
    let rows = conn
      .execute(&update, [])
      .map_err(Error::step(format!("back-fill {qualified}")))?;
    debug!(table, column = %column.name, rows, "back-filled existing rows");
    report.columns_backfilled.push(qualified);
  }

  if column.default.is_some() && column.addable_default().is_none() {
    warn!(
      table,
      column = %column.name,
      "default is not constant and was not attached to the added column; \
       existing rows were back-filled, new rows must supply a value"
    );
  }

  Ok(())
}

fn create_index(
  conn: &Connection,
  ddl: &Ddl<'_>,
  index: &IndexSpec,
  retry_delay: Duration,
  report: &mut SyncReport,
) -> Result<()> {
  info!(index = %index.name, table = %index.table, "creating index");
  let sql = ddl.create_index(index)?;
  let outcome = execute_tolerant(conn, &sql, retry_delay)
    .map_err(Error::step(format!("create index {}", index.name)))?;

  if outcome.applied() {
    report.indexes_created.push(index.name.clone());
  } else {
    info!(index = %index.name, ?outcome, "index not created, it may already exist");
    report.conflicts_tolerated.push(index.name.clone());
  }
  Ok(())
}
