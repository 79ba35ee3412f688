//! Reading the live schema out of `sqlite_master` and `pragma_table_info`.
//!
//! This is the only place catalog rows are decoded; the rest of the crate
//! works with the typed [`LiveSchema`].

use magpie_schema::live::{ExistingColumn, ExistingIndex, ExistingTable, LiveSchema};
use rusqlite::{Connection, Row};

use crate::Result;

const TABLES_SQL: &str = "SELECT name FROM sqlite_master
   WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
   ORDER BY name";

const COLUMNS_SQL: &str = "SELECT cid, name, type, \"notnull\", dflt_value, pk
   FROM pragma_table_info(?1)
   ORDER BY cid";

const INDEXES_SQL: &str = "SELECT name, tbl_name, sql FROM sqlite_master
   WHERE type = 'index' AND name NOT LIKE 'sqlite_%'
   ORDER BY name";

/// Snapshot every user table, its columns, and every user index.
pub fn introspect(conn: &Connection) -> Result<LiveSchema> {
  let mut live = LiveSchema::default();

  let mut tables_stmt = conn.prepare(TABLES_SQL)?;
  let names = tables_stmt
    .query_map([], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut columns_stmt = conn.prepare(COLUMNS_SQL)?;
  for name in names {
    let columns = columns_stmt
      .query_map([&name], decode_column)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    live.insert_table(ExistingTable { name, columns });
  }

  let mut indexes_stmt = conn.prepare(INDEXES_SQL)?;
  let indexes = indexes_stmt
    .query_map([], decode_index)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  for index in indexes {
    live.insert_index(index);
  }

  Ok(live)
}

fn decode_column(row: &Row<'_>) -> rusqlite::Result<ExistingColumn> {
  Ok(ExistingColumn {
    cid:       row.get(0)?,
    name:      row.get(1)?,
    decl_type: row.get(2)?,
    notnull:   row.get(3)?,
    default:   row.get(4)?,
    pk:        row.get(5)?,
  })
}

fn decode_index(row: &Row<'_>) -> rusqlite::Result<ExistingIndex> {
  Ok(ExistingIndex {
    name:  row.get(0)?,
    table: row.get(1)?,
    sql:   row.get(2)?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_tables_columns_and_indexes() {
    let conn = Connection::open_in_memory().unwrap();
    conn
      .execute_batch(
        "CREATE TABLE events (
           id TEXT PRIMARY KEY NOT NULL,
           name TEXT NOT NULL,
           is_active INTEGER DEFAULT 0
         );
         CREATE INDEX idx_events_active ON events (is_active);",
      )
      .unwrap();

    let live = introspect(&conn).unwrap();
    let events = live.table("events").unwrap();
    assert_eq!(events.columns.len(), 3);

    let id = events.column("id").unwrap();
    assert_eq!(id.decl_type, "TEXT");
    assert!(id.notnull);
    assert_eq!(id.pk, 1);

    let active = events.column("is_active").unwrap();
    assert_eq!(active.decl_type, "INTEGER");
    assert!(!active.notnull);
    assert_eq!(active.default.as_deref(), Some("0"));

    let idx = &live.indexes["idx_events_active"];
    assert_eq!(idx.table, "events");
    assert!(idx.sql.as_deref().unwrap().contains("is_active"));
  }

  #[test]
  fn skips_sqlite_internal_objects() {
    let conn = Connection::open_in_memory().unwrap();
    // The TEXT primary key produces an implicit `sqlite_autoindex_*`, and
    // AUTOINCREMENT creates `sqlite_sequence`.
    conn
      .execute_batch(
        "CREATE TABLE a (id TEXT PRIMARY KEY);
         CREATE TABLE b (id INTEGER PRIMARY KEY AUTOINCREMENT);",
      )
      .unwrap();

    let live = introspect(&conn).unwrap();
    assert_eq!(live.tables.keys().collect::<Vec<_>>(), ["a", "b"]);
    assert!(live.indexes.is_empty());
  }

  #[test]
  fn empty_database() {
    let conn = Connection::open_in_memory().unwrap();
    assert_eq!(introspect(&conn).unwrap(), LiveSchema::default());
  }
}
