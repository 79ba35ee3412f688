//! Building blocks of a declared schema: columns, indexes, tables and seed
//! rows.
//!
//! These are plain values. Validation happens once, when they are assembled
//! into a [`SchemaDefinition`](crate::SchemaDefinition).

use serde::{Deserialize, Serialize};

// ─── Column types ────────────────────────────────────────────────────────────

/// Storage type tag of a declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
  Text,
  Integer,
}

impl ColumnType {
  pub fn as_sql(self) -> &'static str {
    match self {
      ColumnType::Text => "TEXT",
      ColumnType::Integer => "INTEGER",
    }
  }

  /// Whether a live declared type (as reported by `PRAGMA table_info`)
  /// denotes this type. SQLite keeps the declared text verbatim, so the
  /// comparison ignores case and surrounding whitespace only.
  pub fn matches(self, live: &str) -> bool {
    live.trim().eq_ignore_ascii_case(self.as_sql())
  }

  /// Value written into pre-existing rows when a NOT NULL column without a
  /// default is added after the fact.
  pub fn zero_sql(self) -> &'static str {
    match self {
      ColumnType::Text => "''",
      ColumnType::Integer => "0",
    }
  }
}

// ─── Defaults ────────────────────────────────────────────────────────────────

/// A column default, rendered into DDL by [`DefaultValue::to_sql`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
  /// A string literal; rendered quoted with embedded quotes doubled.
  Text(String),
  Integer(i64),
  /// The `CURRENT_TIMESTAMP` keyword.
  CurrentTimestamp,
}

impl DefaultValue {
  pub fn text(value: impl Into<String>) -> Self { DefaultValue::Text(value.into()) }

  pub fn to_sql(&self) -> String {
    match self {
      DefaultValue::Text(s) => quote_literal(s),
      DefaultValue::Integer(n) => n.to_string(),
      DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_owned(),
    }
  }

  /// SQLite refuses non-constant defaults in `ALTER TABLE ... ADD COLUMN`.
  pub fn is_constant(&self) -> bool {
    !matches!(self, DefaultValue::CurrentTimestamp)
  }
}

/// Quote `s` as an SQL string literal.
pub fn quote_literal(s: &str) -> String { format!("'{}'", s.replace('\'', "''")) }

// ─── Foreign keys ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
  Cascade,
  SetNull,
  Restrict,
}

impl ReferentialAction {
  pub fn as_sql(self) -> &'static str {
    match self {
      ReferentialAction::Cascade => "CASCADE",
      ReferentialAction::SetNull => "SET NULL",
      ReferentialAction::Restrict => "RESTRICT",
    }
  }
}

/// Target of a `FOREIGN KEY (col) REFERENCES ...` clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
  pub table:     String,
  pub column:    String,
  pub on_delete: Option<ReferentialAction>,
}

impl ForeignKey {
  pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
    Self {
      table:     table.into(),
      column:    column.into(),
      on_delete: None,
    }
  }

  pub fn on_delete(mut self, action: ReferentialAction) -> Self {
    self.on_delete = Some(action);
    self
  }
}

// ─── Columns ─────────────────────────────────────────────────────────────────

/// Desired end-state of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
  pub name:        String,
  #[serde(rename = "type")]
  pub ty:          ColumnType,
  pub nullable:    bool,
  pub default:     Option<DefaultValue>,
  pub primary_key: bool,
  pub foreign_key: Option<ForeignKey>,
  pub unique:      bool,
}

impl ColumnSpec {
  pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
    Self {
      name: name.into(),
      ty,
      nullable: true,
      default: None,
      primary_key: false,
      foreign_key: None,
      unique: false,
    }
  }

  pub fn text(name: impl Into<String>) -> Self { Self::new(name, ColumnType::Text) }

  pub fn integer(name: impl Into<String>) -> Self { Self::new(name, ColumnType::Integer) }

  pub fn not_null(mut self) -> Self {
    self.nullable = false;
    self
  }

  /// Mark the column as the primary key. Primary keys are declared NOT NULL
  /// as well.
  pub fn primary_key(mut self) -> Self {
    self.primary_key = true;
    self.nullable = false;
    self
  }

  pub fn unique(mut self) -> Self {
    self.unique = true;
    self
  }

  pub fn default(mut self, value: DefaultValue) -> Self {
    self.default = Some(value);
    self
  }

  pub fn references(mut self, fk: ForeignKey) -> Self {
    self.foreign_key = Some(fk);
    self
  }

  /// The default that can be inlined into `ADD COLUMN`, if any.
  pub fn addable_default(&self) -> Option<&DefaultValue> {
    self.default.as_ref().filter(|d| d.is_constant())
  }

  /// Expression to write into pre-existing rows after `ADD COLUMN`, or
  /// `None` if the added column needs no follow-up.
  ///
  /// A NOT NULL column without a default gets the type's zero value. A
  /// column whose default could not be inlined gets that default.
  pub fn backfill_sql(&self) -> Option<String> {
    match &self.default {
      None if !self.nullable => Some(self.ty.zero_sql().to_owned()),
      Some(d) if !d.is_constant() => Some(d.to_sql()),
      _ => None,
    }
  }
}

// ─── Indexes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
  pub name:    String,
  pub table:   String,
  pub columns: Vec<String>,
  pub unique:  bool,
}

impl IndexSpec {
  pub fn new(
    name: impl Into<String>,
    table: impl Into<String>,
    columns: &[&str],
  ) -> Self {
    Self {
      name:    name.into(),
      table:   table.into(),
      columns: columns.iter().map(|c| (*c).to_owned()).collect(),
      unique:  false,
    }
  }

  pub fn unique(mut self) -> Self {
    self.unique = true;
    self
  }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

/// Desired end-state of one table. Column order is creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
  pub name:    String,
  pub columns: Vec<ColumnSpec>,
  pub indexes: Vec<IndexSpec>,
}

impl TableSpec {
  pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
    Self {
      name: name.into(),
      columns,
      indexes: Vec::new(),
    }
  }

  pub fn index(mut self, index: IndexSpec) -> Self {
    self.indexes.push(index);
    self
  }

  pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
    self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
  }
}

// ─── Seed rows ───────────────────────────────────────────────────────────────

/// A baseline row that must exist after every reconciliation.
///
/// Presence is decided by `key_column = key_value`; when absent, the row is
/// inserted with the key plus `values`, all bound as TEXT parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRow {
  pub table:      String,
  pub key_column: String,
  pub key_value:  String,
  pub values:     Vec<(String, String)>,
}

impl SeedRow {
  pub fn new(
    table: impl Into<String>,
    key_column: impl Into<String>,
    key_value: impl Into<String>,
  ) -> Self {
    Self {
      table:      table.into(),
      key_column: key_column.into(),
      key_value:  key_value.into(),
      values:     Vec::new(),
    }
  }

  pub fn value(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
    self.values.push((column.into(), value.into()));
    self
  }

  /// Column names in insertion order, key first.
  pub fn columns(&self) -> impl Iterator<Item = &str> {
    std::iter::once(self.key_column.as_str())
      .chain(self.values.iter().map(|(c, _)| c.as_str()))
  }

  /// Bound parameter values in the same order as [`SeedRow::columns`].
  pub fn params(&self) -> Vec<&str> {
    std::iter::once(self.key_value.as_str())
      .chain(self.values.iter().map(|(_, v)| v.as_str()))
      .collect()
  }
}
