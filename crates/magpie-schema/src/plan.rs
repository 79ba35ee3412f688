//! Diff computation between the declared schema and a live snapshot.
//!
//! The planner is pure: it never touches a database, so the same plan can be
//! applied by the reconciler or printed as a dry run.

use serde::Serialize;

use crate::{
  SchemaDefinition,
  live::LiveSchema,
  model::{ColumnSpec, ColumnType, IndexSpec, TableSpec},
};

/// One unit of reconciliation work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step<'s> {
  CreateTable {
    table: &'s TableSpec,
  },
  AddColumn {
    table:  &'s str,
    column: &'s ColumnSpec,
  },
  /// Reported only; existing column types are never altered.
  TypeMismatch {
    table:    &'s str,
    column:   &'s str,
    expected: ColumnType,
    found:    String,
  },
  CreateIndex {
    index: &'s IndexSpec,
  },
}

impl Step<'_> {
  pub fn is_mutation(&self) -> bool { !matches!(self, Step::TypeMismatch { .. }) }
}

/// Ordered steps plus the live tables the declared schema does not know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan<'s> {
  pub steps:         Vec<Step<'s>>,
  /// Live tables absent from the declared schema. Reported, never dropped.
  pub orphan_tables: Vec<String>,
}

impl SyncPlan<'_> {
  /// True when applying the plan would not change the database structure.
  pub fn is_empty(&self) -> bool { !self.steps.iter().any(Step::is_mutation) }

  pub fn mutations(&self) -> usize { self.steps.iter().filter(|s| s.is_mutation()).count() }
}

/// Compute the steps that bring `live` to `schema`, in declaration order.
///
/// For each declared table: create it if missing, otherwise add every
/// missing column and flag every type mismatch; then create each of its
/// indexes that is missing.
pub fn plan<'s>(schema: &'s SchemaDefinition, live: &LiveSchema) -> SyncPlan<'s> {
  let mut steps = Vec::new();

  for table in schema.tables() {
    match live.table(&table.name) {
      None => steps.push(Step::CreateTable { table }),
      Some(existing) => {
        for column in &table.columns {
          match existing.column(&column.name) {
            None => steps.push(Step::AddColumn {
              table: &table.name,
              column,
            }),
            Some(found) if !column.ty.matches(&found.decl_type) => {
              steps.push(Step::TypeMismatch {
                table:    &table.name,
                column:   &column.name,
                expected: column.ty,
                found:    found.decl_type.clone(),
              });
            }
            Some(_) => {}
          }
        }
      }
    }

    for index in &table.indexes {
      if !live.has_index(&index.name) {
        steps.push(Step::CreateIndex { index });
      }
    }
  }

  let orphan_tables = live
    .tables
    .values()
    .filter(|existing| schema.table(&existing.name).is_none())
    .map(|existing| existing.name.clone())
    .collect();

  SyncPlan { steps, orphan_tables }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    live::{ExistingColumn, ExistingIndex, ExistingTable},
    model::DefaultValue,
  };

  fn schema() -> SchemaDefinition {
    let events = TableSpec::new(
      "events",
      vec![
        ColumnSpec::text("id").primary_key(),
        ColumnSpec::text("name").not_null(),
        ColumnSpec::integer("is_active").default(DefaultValue::Integer(0)),
      ],
    )
    .index(IndexSpec::new("idx_events_active", "events", &["is_active"]));
    let registrations = TableSpec::new(
      "registrations",
      vec![ColumnSpec::text("id").primary_key(), ColumnSpec::text("email").not_null()],
    )
    .index(IndexSpec::new("idx_registrations_email", "registrations", &["email"]));
    SchemaDefinition::new(vec![events, registrations], vec![]).unwrap()
  }

  fn live_table(name: &str, columns: &[(&str, &str)]) -> ExistingTable {
    ExistingTable {
      name:    name.to_owned(),
      columns: columns
        .iter()
        .enumerate()
        .map(|(cid, (n, t))| ExistingColumn {
          cid:       cid as i64,
          name:      (*n).to_owned(),
          decl_type: (*t).to_owned(),
          notnull:   false,
          default:   None,
          pk:        0,
        })
        .collect(),
    }
  }

  fn live_index(name: &str, table: &str) -> ExistingIndex {
    ExistingIndex {
      name:  name.to_owned(),
      table: table.to_owned(),
      sql:   None,
    }
  }

  #[test]
  fn empty_database_creates_everything_in_order() {
    let s = schema();
    let p = plan(&s, &LiveSchema::default());

    let kinds: Vec<String> = p
      .steps
      .iter()
      .map(|step| match step {
        Step::CreateTable { table } => format!("table:{}", table.name),
        Step::CreateIndex { index } => format!("index:{}", index.name),
        other => panic!("unexpected step {other:?}"),
      })
      .collect();
    assert_eq!(
      kinds,
      [
        "table:events",
        "index:idx_events_active",
        "table:registrations",
        "index:idx_registrations_email",
      ]
    );
    assert!(p.orphan_tables.is_empty());
    assert_eq!(p.mutations(), 4);
  }

  #[test]
  fn existing_table_gets_missing_columns_only() {
    let s = schema();
    let mut live = LiveSchema::default();
    live.insert_table(live_table("events", &[("id", "TEXT"), ("name", "TEXT")]));
    live.insert_index(live_index("idx_events_active", "events"));

    let p = plan(&s, &live);
    assert!(matches!(
      p.steps[0],
      Step::AddColumn { table: "events", column } if column.name == "is_active"
    ));
    assert!(matches!(p.steps[1], Step::CreateTable { table } if table.name == "registrations"));
    assert_eq!(p.steps.len(), 3);
  }

  #[test]
  fn type_mismatch_is_reported_not_planned() {
    let s = schema();
    let mut live = LiveSchema::default();
    live.insert_table(live_table(
      "events",
      &[("id", "text"), ("name", "VARCHAR(40)"), ("is_active", "INTEGER")],
    ));
    live.insert_table(live_table("registrations", &[("id", "TEXT"), ("email", "TEXT")]));
    live.insert_index(live_index("idx_events_active", "events"));
    live.insert_index(live_index("idx_registrations_email", "registrations"));

    let p = plan(&s, &live);
    assert_eq!(
      p.steps,
      [Step::TypeMismatch {
        table:    "events",
        column:   "name",
        expected: ColumnType::Text,
        found:    "VARCHAR(40)".into(),
      }]
    );
    assert!(p.is_empty());
  }

  #[test]
  fn undeclared_tables_are_orphans() {
    let s = schema();
    let mut live = LiveSchema::default();
    live.insert_table(live_table("legacy_sheet", &[("row", "TEXT")]));

    let p = plan(&s, &live);
    assert_eq!(p.orphan_tables, ["legacy_sheet"]);
    assert!(!p.is_empty());
  }

  #[test]
  fn differently_cased_live_table_is_the_declared_one() {
    let s = schema();
    let mut live = LiveSchema::default();
    live.insert_table(live_table("Events", &[("ID", "TEXT"), ("Name", "TEXT")]));
    live.insert_index(live_index("IDX_EVENTS_ACTIVE", "Events"));

    let p = plan(&s, &live);
    assert!(matches!(
      p.steps[0],
      Step::AddColumn { table: "events", column } if column.name == "is_active"
    ));
    assert!(matches!(p.steps[1], Step::CreateTable { table } if table.name == "registrations"));
    assert_eq!(p.steps.len(), 3);
    assert!(p.orphan_tables.is_empty());
  }

  #[test]
  fn plan_serialises_with_action_tags() {
    let s = schema();
    let p = plan(&s, &LiveSchema::default());
    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(json["steps"][0]["action"], "create_table");
    assert_eq!(json["steps"][0]["table"]["name"], "events");
    assert_eq!(json["steps"][1]["action"], "create_index");
  }
}
