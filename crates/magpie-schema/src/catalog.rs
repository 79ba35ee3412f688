//! The event-registration schema served by MagPie.
//!
//! Column names, types and defaults here are what the CRUD services query
//! directly. Change them only together with those queries.

use crate::{
  Result, SchemaDefinition,
  model::{ColumnSpec, DefaultValue, ForeignKey, IndexSpec, ReferentialAction, SeedRow, TableSpec},
};

/// Key of the single branding row the site reads its settings from.
pub const DEFAULT_BRANDING_ID: &str = "default";

/// Build the declared schema. Table order is reconciliation order.
pub fn event_registration() -> Result<SchemaDefinition> {
  SchemaDefinition::new(
    vec![
      events(),
      event_fields(),
      registrations(),
      user_profiles(),
      qr_codes(),
      branding_settings(),
      message_templates(),
      test_migration(),
    ],
    vec![default_branding()],
  )
}

fn id() -> ColumnSpec { ColumnSpec::text("id").primary_key() }

fn event_ref() -> ColumnSpec {
  ColumnSpec::text("event_id")
    .not_null()
    .references(ForeignKey::new("events", "id").on_delete(ReferentialAction::Cascade))
}

fn timestamp(name: &str) -> ColumnSpec {
  ColumnSpec::text(name).default(DefaultValue::CurrentTimestamp)
}

fn flag(name: &str, on: bool) -> ColumnSpec {
  ColumnSpec::integer(name).default(DefaultValue::Integer(i64::from(on)))
}

fn events() -> TableSpec {
  TableSpec::new(
    "events",
    vec![
      id(),
      ColumnSpec::text("name").not_null(),
      ColumnSpec::text("description"),
      ColumnSpec::text("date").not_null(),
      ColumnSpec::text("time").not_null(),
      ColumnSpec::text("venue").not_null(),
      ColumnSpec::text("venue_address"),
      ColumnSpec::text("venue_map_link"),
      flag("is_active", false),
      flag("registrations_open", true),
      timestamp("created_at"),
      timestamp("updated_at"),
    ],
  )
  .index(IndexSpec::new("idx_events_active", "events", &["is_active"]))
}

fn event_fields() -> TableSpec {
  TableSpec::new(
    "event_fields",
    vec![
      id(),
      event_ref(),
      ColumnSpec::text("field_name").not_null(),
      ColumnSpec::text("field_type").not_null(),
      ColumnSpec::text("field_label").not_null(),
      flag("is_required", false),
      ColumnSpec::text("field_options"),
      ColumnSpec::integer("field_order").default(DefaultValue::Integer(0)),
    ],
  )
}

fn registrations() -> TableSpec {
  TableSpec::new(
    "registrations",
    vec![
      id(),
      event_ref(),
      ColumnSpec::text("email").not_null(),
      ColumnSpec::text("phone").not_null(),
      ColumnSpec::text("form_data").not_null(),
      flag("is_checked_in", false),
      ColumnSpec::text("checked_in_at"),
      timestamp("created_at"),
    ],
  )
  .index(IndexSpec::new("idx_registrations_event", "registrations", &["event_id"]))
  .index(IndexSpec::new("idx_registrations_email", "registrations", &["email"]))
}

fn user_profiles() -> TableSpec {
  TableSpec::new(
    "user_profiles",
    vec![
      id(),
      ColumnSpec::text("email").not_null().unique(),
      ColumnSpec::text("phone"),
      ColumnSpec::text("profile_data").not_null(),
      timestamp("last_updated"),
    ],
  )
  .index(IndexSpec::new("idx_user_profiles_email", "user_profiles", &["email"]))
}

fn qr_codes() -> TableSpec {
  TableSpec::new(
    "qr_codes",
    vec![
      id(),
      event_ref(),
      ColumnSpec::text("message").not_null(),
      ColumnSpec::text("qr_type").default(DefaultValue::text("message")),
      timestamp("created_at"),
    ],
  )
}

fn branding_settings() -> TableSpec {
  TableSpec::new(
    "branding_settings",
    vec![
      id(),
      ColumnSpec::text("site_title").default(DefaultValue::text("MagPie")),
      ColumnSpec::text("site_headline")
        .default(DefaultValue::text("Where Innovation Meets Community")),
      ColumnSpec::text("logo_url"),
      ColumnSpec::text("text_style").default(DefaultValue::text("gradient")),
      ColumnSpec::text("theme").default(DefaultValue::text("default")),
      timestamp("updated_at"),
    ],
  )
}

fn message_templates() -> TableSpec {
  TableSpec::new(
    "message_templates",
    vec![
      id(),
      ColumnSpec::text("template_name").not_null(),
      ColumnSpec::text("template_text").not_null(),
      timestamp("created_at"),
      timestamp("updated_at"),
    ],
  )
  .index(IndexSpec::new(
    "idx_message_templates_name",
    "message_templates",
    &["template_name"],
  ))
}

// Diagnostic table used to exercise column additions on deployed databases.
fn test_migration() -> TableSpec {
  TableSpec::new(
    "test_migration",
    vec![
      id(),
      ColumnSpec::text("test_field").not_null(),
      ColumnSpec::integer("test_number").default(DefaultValue::Integer(0)),
      ColumnSpec::text("new_test_column").default(DefaultValue::text("default_value")),
      timestamp("created_at"),
    ],
  )
  .index(IndexSpec::new("idx_test_migration_field", "test_migration", &["test_field"]))
}

fn default_branding() -> SeedRow {
  SeedRow::new("branding_settings", "id", DEFAULT_BRANDING_ID)
    .value("site_title", "MagPie")
    .value("site_headline", "Where Events Take Flight")
    .value("text_style", "gradient")
}
