//! [`SchemaDefinition`]: the validated, immutable target schema.

use std::collections::HashSet;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{
  Error, Result,
  ddl,
  model::{IndexSpec, SeedRow, TableSpec},
};

/// The declared end-state of the whole database.
///
/// Built once at startup and shared by reference; every identifier it holds
/// has been checked by [`validate_identifier`], which is what allows the DDL
/// builder to interpolate them.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDefinition {
  tables: Vec<TableSpec>,
  seeds:  Vec<SeedRow>,
}

impl SchemaDefinition {
  /// Validate and assemble a schema. Table order is reconciliation order.
  ///
  /// Names are compared ignoring ASCII case, as SQLite compares them.
  pub fn new(tables: Vec<TableSpec>, seeds: Vec<SeedRow>) -> Result<Self> {
    let mut table_names = HashSet::new();
    let mut index_names = HashSet::new();

    for table in &tables {
      validate_identifier(&table.name)?;
      if !table_names.insert(table.name.to_ascii_lowercase()) {
        return Err(Error::DuplicateTable(table.name.clone()));
      }

      let mut column_names = HashSet::new();
      for column in &table.columns {
        validate_identifier(&column.name)?;
        if !column_names.insert(column.name.to_ascii_lowercase()) {
          return Err(Error::DuplicateColumn {
            table:  table.name.clone(),
            column: column.name.clone(),
          });
        }
      }

      for index in &table.indexes {
        validate_identifier(&index.name)?;
        if !index_names.insert(index.name.to_ascii_lowercase()) {
          return Err(Error::DuplicateIndex(index.name.clone()));
        }
        if !index.table.eq_ignore_ascii_case(&table.name) {
          return Err(Error::IndexTableMismatch {
            index:  index.name.clone(),
            owner:  table.name.clone(),
            target: index.table.clone(),
          });
        }
        if index.columns.is_empty() {
          return Err(Error::EmptyIndex(index.name.clone()));
        }
        for column in &index.columns {
          require_column(table, column)?;
        }
      }
    }

    // Foreign keys and seeds may point at any declared table, so check them
    // once every table is known.
    for table in &tables {
      for column in &table.columns {
        if let Some(fk) = &column.foreign_key {
          let target = tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(&fk.table))
            .ok_or_else(|| Error::UnknownTable(fk.table.clone()))?;
          require_column(target, &fk.column)?;
        }
      }
    }

    for seed in &seeds {
      let table = tables
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(&seed.table))
        .ok_or_else(|| Error::UnknownTable(seed.table.clone()))?;
      for column in seed.columns() {
        require_column(table, column)?;
      }
    }

    Ok(Self { tables, seeds })
  }

  pub fn tables(&self) -> &[TableSpec] { &self.tables }

  pub fn seeds(&self) -> &[SeedRow] { &self.seeds }

  pub fn table(&self, name: &str) -> Option<&TableSpec> {
    self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
  }

  pub fn index(&self, name: &str) -> Option<&IndexSpec> {
    self.tables.iter().flat_map(|t| &t.indexes).find(|i| i.name.eq_ignore_ascii_case(name))
  }

  /// Hex SHA-256 over the rendered `CREATE` statements, in declaration
  /// order. Two processes agree on the fingerprint iff they would build the
  /// same tables and indexes from scratch.
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    for table in &self.tables {
      hasher.update(ddl::render_create_table(table).as_bytes());
      hasher.update(b";\n");
      for index in &table.indexes {
        hasher.update(ddl::render_create_index(index).as_bytes());
        hasher.update(b";\n");
      }
    }
    hex::encode(hasher.finalize())
  }
}

fn require_column(table: &TableSpec, column: &str) -> Result<()> {
  match table.column(column) {
    Some(_) => Ok(()),
    None => Err(Error::UnknownColumn {
      table:  table.name.clone(),
      column: column.to_owned(),
    }),
  }
}

/// Accept only plain `[A-Za-z_][A-Za-z0-9_]*` names outside SQLite's
/// reserved `sqlite_` namespace.
pub fn validate_identifier(name: &str) -> Result<()> {
  let mut chars = name.chars();
  let head_ok = chars
    .next()
    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
  let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
  let reserved = name
    .get(..7)
    .is_some_and(|prefix| prefix.eq_ignore_ascii_case("sqlite_"));

  if head_ok && tail_ok && !reserved {
    Ok(())
  } else {
    Err(Error::InvalidIdentifier(name.to_owned()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{ColumnSpec, ForeignKey};

  fn events() -> TableSpec {
    TableSpec::new(
      "events",
      vec![ColumnSpec::text("id").primary_key(), ColumnSpec::text("name").not_null()],
    )
  }

  #[test]
  fn identifiers() {
    assert!(validate_identifier("events").is_ok());
    assert!(validate_identifier("_x1").is_ok());
    assert!(validate_identifier("").is_err());
    assert!(validate_identifier("1abc").is_err());
    assert!(validate_identifier("a b").is_err());
    assert!(validate_identifier("x; DROP TABLE y").is_err());
    assert!(validate_identifier("sqlite_master").is_err());
    assert!(validate_identifier("SQLITE_stat1").is_err());
  }

  #[test]
  fn rejects_duplicate_tables() {
    let err = SchemaDefinition::new(vec![events(), events()], vec![]).unwrap_err();
    assert!(matches!(err, Error::DuplicateTable(t) if t == "events"));
  }

  #[test]
  fn names_differing_only_in_case_collide() {
    let shouty = TableSpec::new("EVENTS", vec![ColumnSpec::text("id")]);
    let err = SchemaDefinition::new(vec![events(), shouty], vec![]).unwrap_err();
    assert!(matches!(err, Error::DuplicateTable(t) if t == "EVENTS"));

    let table = TableSpec::new("t", vec![ColumnSpec::text("a"), ColumnSpec::text("A")]);
    assert!(matches!(
      SchemaDefinition::new(vec![table], vec![]).unwrap_err(),
      Error::DuplicateColumn { .. }
    ));
  }

  #[test]
  fn rejects_duplicate_columns() {
    let table = TableSpec::new("t", vec![ColumnSpec::text("a"), ColumnSpec::integer("a")]);
    let err = SchemaDefinition::new(vec![table], vec![]).unwrap_err();
    assert!(matches!(err, Error::DuplicateColumn { .. }));
  }

  #[test]
  fn index_names_are_global() {
    let a = TableSpec::new("a", vec![ColumnSpec::text("x")])
      .index(IndexSpec::new("idx_x", "a", &["x"]));
    let b = TableSpec::new("b", vec![ColumnSpec::text("x")])
      .index(IndexSpec::new("idx_x", "b", &["x"]));
    let err = SchemaDefinition::new(vec![a, b], vec![]).unwrap_err();
    assert!(matches!(err, Error::DuplicateIndex(n) if n == "idx_x"));
  }

  #[test]
  fn index_must_target_owner_and_known_columns() {
    let wrong_owner = TableSpec::new("a", vec![ColumnSpec::text("x")])
      .index(IndexSpec::new("idx", "b", &["x"]));
    assert!(matches!(
      SchemaDefinition::new(vec![wrong_owner], vec![]).unwrap_err(),
      Error::IndexTableMismatch { .. }
    ));

    let unknown_col = TableSpec::new("a", vec![ColumnSpec::text("x")])
      .index(IndexSpec::new("idx", "a", &["y"]));
    assert!(matches!(
      SchemaDefinition::new(vec![unknown_col], vec![]).unwrap_err(),
      Error::UnknownColumn { .. }
    ));
  }

  #[test]
  fn foreign_keys_must_resolve() {
    let child = TableSpec::new(
      "child",
      vec![ColumnSpec::text("event_id").references(ForeignKey::new("events", "uuid"))],
    );
    let err = SchemaDefinition::new(vec![events(), child], vec![]).unwrap_err();
    assert!(matches!(err, Error::UnknownColumn { table, column } if table == "events" && column == "uuid"));
  }

  #[test]
  fn seeds_must_resolve() {
    let seed = SeedRow::new("events", "id", "e1").value("title", "x");
    let err = SchemaDefinition::new(vec![events()], vec![seed]).unwrap_err();
    assert!(matches!(err, Error::UnknownColumn { .. }));
  }

  #[test]
  fn fingerprint_tracks_structure() {
    let a = SchemaDefinition::new(vec![events()], vec![]).unwrap();
    let b = SchemaDefinition::new(vec![events()], vec![]).unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.fingerprint().len(), 64);

    let mut changed = events();
    changed.columns.push(ColumnSpec::integer("is_active"));
    let c = SchemaDefinition::new(vec![changed], vec![]).unwrap();
    assert_ne!(a.fingerprint(), c.fingerprint());
  }
}
