//! Snapshot of what the database actually contains.
//!
//! Re-read on every reconciliation and discarded afterwards.

use std::collections::BTreeMap;

use serde::Serialize;

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingColumn {
  pub cid:       i64,
  pub name:      String,
  /// Declared type text, verbatim; empty for untyped columns.
  pub decl_type: String,
  pub notnull:   bool,
  pub default:   Option<String>,
  /// 1-based position within the primary key, 0 if not part of it.
  pub pk:        i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingTable {
  pub name:    String,
  pub columns: Vec<ExistingColumn>,
}

impl ExistingTable {
  pub fn column(&self, name: &str) -> Option<&ExistingColumn> {
    self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingIndex {
  pub name:  String,
  pub table: String,
  /// `None` for indexes SQLite creates implicitly.
  pub sql:   Option<String>,
}

/// Tables and indexes found in the database, keyed by ASCII-lowercased name
/// since SQLite resolves identifiers case-insensitively. Each entry keeps the
/// name as the database spells it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiveSchema {
  pub tables:  BTreeMap<String, ExistingTable>,
  pub indexes: BTreeMap<String, ExistingIndex>,
}

impl LiveSchema {
  pub fn table(&self, name: &str) -> Option<&ExistingTable> {
    self.tables.get(&name.to_ascii_lowercase())
  }

  pub fn has_table(&self, name: &str) -> bool {
    self.tables.contains_key(&name.to_ascii_lowercase())
  }

  pub fn has_index(&self, name: &str) -> bool {
    self.indexes.contains_key(&name.to_ascii_lowercase())
  }

  pub fn insert_table(&mut self, table: ExistingTable) {
    self.tables.insert(table.name.to_ascii_lowercase(), table);
  }

  pub fn insert_index(&mut self, index: ExistingIndex) {
    self.indexes.insert(index.name.to_ascii_lowercase(), index);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookups_ignore_ascii_case() {
    let mut live = LiveSchema::default();
    live.insert_table(ExistingTable {
      name:    "Events".into(),
      columns: vec![ExistingColumn {
        cid:       0,
        name:      "Name".into(),
        decl_type: "TEXT".into(),
        notnull:   false,
        default:   None,
        pk:        0,
      }],
    });
    live.insert_index(ExistingIndex {
      name:  "IDX_Events_Name".into(),
      table: "Events".into(),
      sql:   None,
    });

    assert!(live.has_table("events"));
    assert!(live.has_index("idx_events_name"));
    let events = live.table("EVENTS").unwrap();
    assert_eq!(events.name, "Events");
    assert!(events.column("name").is_some());
  }
}
