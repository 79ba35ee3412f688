//! Classification of storage errors raised while mutating the schema.
//!
//! Two processes booting against the same database can race on the same
//! `ALTER TABLE` or `CREATE INDEX`. The loser sees either a "duplicate"
//! error (the winner already applied the change) or a transient lock
//! conflict. Both are recoverable; everything else is fatal.

use std::{thread, time::Duration};

use rusqlite::{Connection, ErrorCode};
use tracing::warn;

/// Delay before the single retry of a transiently conflicting statement.
pub const RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
  /// The object already exists; the statement's intent is satisfied.
  Duplicate,
  /// A concurrent writer holds the resource; worth one retry.
  Transient,
  Other,
}

/// Classify `err`, preferring SQLite's typed result code.
///
/// SQLite reports duplicate columns and indexes with the generic
/// `SQLITE_ERROR` code, and libsql reports WAL frame conflicts only by
/// message, so those two fall back to matching the message text.
pub fn classify(err: &rusqlite::Error) -> Conflict {
  if let rusqlite::Error::SqliteFailure(ffi, _) = err
    && matches!(ffi.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
  {
    return Conflict::Transient;
  }

  let message = err.to_string().to_ascii_lowercase();
  if message.contains("duplicate column name") || message.contains("already exists") {
    Conflict::Duplicate
  } else if message.contains("wal frame insert conflict") {
    Conflict::Transient
  } else {
    Conflict::Other
  }
}

/// How a conflict-tolerant statement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Applied,
  AppliedOnRetry,
  AlreadyPresent,
  /// Still conflicting after the retry. Non-fatal: the racing writer has
  /// most likely applied the same change.
  GaveUp,
}

impl Outcome {
  pub fn applied(self) -> bool { matches!(self, Outcome::Applied | Outcome::AppliedOnRetry) }
}

/// Execute a single DDL statement, absorbing duplicate and transient
/// conflicts. Any other error is returned unchanged.
pub fn execute_tolerant(
  conn: &Connection,
  sql: &str,
  retry_delay: Duration,
) -> rusqlite::Result<Outcome> {
  let first = match conn.execute(sql, []) {
    Ok(_) => return Ok(Outcome::Applied),
    Err(e) => e,
  };

  match classify(&first) {
    Conflict::Duplicate => Ok(Outcome::AlreadyPresent),
    Conflict::Other => Err(first),
    Conflict::Transient => {
      warn!(error = %first, "write conflict, retrying once");
      thread::sleep(retry_delay);
      match conn.execute(sql, []) {
        Ok(_) => Ok(Outcome::AppliedOnRetry),
        Err(second) => match classify(&second) {
          Conflict::Duplicate => Ok(Outcome::AlreadyPresent),
          Conflict::Transient => {
            warn!(error = %second, "write conflict persisted after retry");
            Ok(Outcome::GaveUp)
          }
          Conflict::Other => Err(second),
        },
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use rusqlite::ffi;

  use super::*;

  fn failure(code: std::os::raw::c_int, message: &str) -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(ffi::Error::new(code), Some(message.to_owned()))
  }

  #[test]
  fn busy_and_locked_are_transient() {
    assert_eq!(classify(&failure(ffi::SQLITE_BUSY, "database is locked")), Conflict::Transient);
    assert_eq!(
      classify(&failure(ffi::SQLITE_LOCKED, "database table is locked")),
      Conflict::Transient
    );
  }

  #[test]
  fn libsql_wal_conflict_is_transient() {
    assert_eq!(
      classify(&failure(ffi::SQLITE_ERROR, "WAL frame insert conflict")),
      Conflict::Transient
    );
  }

  #[test]
  fn real_duplicate_column_error() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE t (a TEXT)").unwrap();
    let err = conn.execute("ALTER TABLE t ADD COLUMN a TEXT", []).unwrap_err();
    assert_eq!(classify(&err), Conflict::Duplicate);
  }

  #[test]
  fn real_duplicate_index_error() {
    let conn = Connection::open_in_memory().unwrap();
    conn
      .execute_batch("CREATE TABLE t (a TEXT); CREATE INDEX idx_a ON t (a);")
      .unwrap();
    let err = conn.execute("CREATE INDEX idx_a ON t (a)", []).unwrap_err();
    assert_eq!(classify(&err), Conflict::Duplicate);
  }

  #[test]
  fn syntax_errors_are_fatal() {
    let conn = Connection::open_in_memory().unwrap();
    let err = conn.execute("ALTER TABLE missing ADD COLUMN a TEXT", []).unwrap_err();
    assert_eq!(classify(&err), Conflict::Other);
  }

  #[test]
  fn tolerant_execution_absorbs_duplicates() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE t (a TEXT)").unwrap();

    let sql = "ALTER TABLE t ADD COLUMN b INTEGER DEFAULT 0";
    assert_eq!(execute_tolerant(&conn, sql, Duration::ZERO).unwrap(), Outcome::Applied);
    assert_eq!(
      execute_tolerant(&conn, sql, Duration::ZERO).unwrap(),
      Outcome::AlreadyPresent
    );
    assert!(execute_tolerant(&conn, "ALTER TABLE nope ADD COLUMN b TEXT", Duration::ZERO).is_err());
  }

  // ─── Lock contention ──────────────────────────────────────────────────────

  /// A file database with table `t`, a connection that fails fast on
  /// `SQLITE_BUSY`, and a second connection holding an exclusive lock.
  fn locked_database(label: &str) -> (std::path::PathBuf, Connection, Connection) {
    let path = std::env::temp_dir().join(format!("magpie-{label}-{}.db", uuid::Uuid::new_v4()));
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE t (a TEXT)").unwrap();
    conn.busy_timeout(Duration::ZERO).unwrap();

    let holder = Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN EXCLUSIVE").unwrap();
    (path, conn, holder)
  }

  #[test]
  fn persistent_lock_gives_up_without_error() {
    let (path, conn, holder) = locked_database("gaveup");

    let outcome = execute_tolerant(&conn, "ALTER TABLE t ADD COLUMN b TEXT", Duration::ZERO);
    assert_eq!(outcome.unwrap(), Outcome::GaveUp);

    holder.execute_batch("ROLLBACK").unwrap();
    assert_eq!(
      conn
        .prepare("SELECT * FROM t")
        .unwrap()
        .column_names()
        .len(),
      1
    );
    drop((conn, holder));
    let _ = std::fs::remove_file(&path);
  }

  #[test]
  fn lock_released_before_retry_applies() {
    let (path, conn, holder) = locked_database("retry");

    let release = thread::spawn(move || {
      thread::sleep(Duration::from_millis(50));
      holder.execute_batch("COMMIT").unwrap();
    });

    let outcome = execute_tolerant(
      &conn,
      "ALTER TABLE t ADD COLUMN b TEXT",
      Duration::from_millis(500),
    );
    release.join().unwrap();
    assert_eq!(outcome.unwrap(), Outcome::AppliedOnRetry);

    drop(conn);
    let _ = std::fs::remove_file(&path);
  }
}
