//! Typed DDL builder.
//!
//! Statements are rendered only for tables, columns, indexes and seed rows
//! that belong to the [`SchemaDefinition`] the builder was created from.
//! Anything else is rejected with [`Error::NotAllowed`]; request input can
//! therefore never reach an interpolated identifier.

use crate::{
  Error, Result, SchemaDefinition,
  model::{ColumnSpec, ForeignKey, IndexSpec, SeedRow, TableSpec},
};

/// Statement builder bound to one declared schema.
#[derive(Debug, Clone, Copy)]
pub struct Ddl<'s> {
  schema: &'s SchemaDefinition,
}

impl<'s> Ddl<'s> {
  pub fn new(schema: &'s SchemaDefinition) -> Self { Self { schema } }

  pub fn schema(&self) -> &'s SchemaDefinition { self.schema }

  /// `CREATE TABLE IF NOT EXISTS` with every column and foreign key.
  pub fn create_table(&self, table: &TableSpec) -> Result<String> {
    self.allow_table(table)?;
    Ok(render_create_table(table))
  }

  /// `ALTER TABLE ... ADD COLUMN`. Only a constant default is inlined and
  /// `NOT NULL` is never emitted; see [`Ddl::backfill`].
  pub fn add_column(&self, table: &str, column: &ColumnSpec) -> Result<String> {
    self.allow_column(table, column)?;
    let mut sql = format!("ALTER TABLE {table} ADD COLUMN {} {}", column.name, column.ty.as_sql());
    if let Some(default) = column.addable_default() {
      sql.push_str(" DEFAULT ");
      sql.push_str(&default.to_sql());
    }
    Ok(sql)
  }

  /// Follow-up `UPDATE` for a freshly added column, if it needs one.
  pub fn backfill(&self, table: &str, column: &ColumnSpec) -> Result<Option<String>> {
    self.allow_column(table, column)?;
    Ok(column.backfill_sql().map(|value| {
      format!(
        "UPDATE {table} SET {col} = {value} WHERE {col} IS NULL",
        col = column.name
      )
    }))
  }

  pub fn create_index(&self, index: &IndexSpec) -> Result<String> {
    match self.schema.index(&index.name) {
      Some(declared) if declared == index => Ok(render_create_index(index)),
      _ => Err(Error::NotAllowed(index.name.clone())),
    }
  }

  /// `SELECT COUNT(*)` probing for the seed row; binds `?1` to the key.
  pub fn seed_exists(&self, seed: &SeedRow) -> Result<String> {
    self.allow_seed(seed)?;
    Ok(format!(
      "SELECT COUNT(*) FROM {} WHERE {} = ?1",
      seed.table, seed.key_column
    ))
  }

  /// Parameterised `INSERT` for the seed row; bind [`SeedRow::params`].
  pub fn seed_insert(&self, seed: &SeedRow) -> Result<String> {
    self.allow_seed(seed)?;
    let columns: Vec<&str> = seed.columns().collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    Ok(format!(
      "INSERT INTO {} ({}) VALUES ({})",
      seed.table,
      columns.join(", "),
      placeholders.join(", ")
    ))
  }

  // ── Allow-list ──────────────────────────────────────────────────────────

  fn allow_table(&self, table: &TableSpec) -> Result<()> {
    match self.schema.table(&table.name) {
      Some(declared) if declared == table => Ok(()),
      _ => Err(Error::NotAllowed(table.name.clone())),
    }
  }

  fn allow_column(&self, table: &str, column: &ColumnSpec) -> Result<()> {
    let declared = self
      .schema
      .table(table)
      .ok_or_else(|| Error::NotAllowed(table.to_owned()))?;
    match declared.column(&column.name) {
      Some(c) if c == column => Ok(()),
      _ => Err(Error::NotAllowed(format!("{table}.{}", column.name))),
    }
  }

  fn allow_seed(&self, seed: &SeedRow) -> Result<()> {
    if self.schema.seeds().contains(seed) {
      Ok(())
    } else {
      Err(Error::NotAllowed(format!("{}.{}", seed.table, seed.key_column)))
    }
  }
}

// ─── Rendering ───────────────────────────────────────────────────────────────

pub(crate) fn render_create_table(table: &TableSpec) -> String {
  let mut parts: Vec<String> = table.columns.iter().map(render_column_def).collect();

  for column in &table.columns {
    if let Some(fk) = &column.foreign_key {
      parts.push(format!(
        "FOREIGN KEY ({}) REFERENCES {}",
        column.name,
        render_reference(fk)
      ));
    }
  }

  format!("CREATE TABLE IF NOT EXISTS {} ({})", table.name, parts.join(", "))
}

pub(crate) fn render_create_index(index: &IndexSpec) -> String {
  let unique = if index.unique { "UNIQUE " } else { "" };
  format!(
    "CREATE {unique}INDEX IF NOT EXISTS {} ON {} ({})",
    index.name,
    index.table,
    index.columns.join(", ")
  )
}

fn render_column_def(column: &ColumnSpec) -> String {
  let mut def = format!("{} {}", column.name, column.ty.as_sql());
  if column.primary_key {
    def.push_str(" PRIMARY KEY");
  }
  if !column.nullable {
    def.push_str(" NOT NULL");
  }
  if column.unique {
    def.push_str(" UNIQUE");
  }
  if let Some(default) = &column.default {
    def.push_str(" DEFAULT ");
    def.push_str(&default.to_sql());
  }
  def
}

fn render_reference(fk: &ForeignKey) -> String {
  match fk.on_delete {
    Some(action) => format!("{}({}) ON DELETE {}", fk.table, fk.column, action.as_sql()),
    None => format!("{}({})", fk.table, fk.column),
  }
}
