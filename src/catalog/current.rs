//! Authoritative schema of the running release.

use crate::schema::{FieldDef, FieldKind, SchemaSet, TableDef};

pub(crate) const EPOCH: &str = "1970-01-01T00:00:00+00:00";

pub fn tenant() -> TableDef {
    TableDef::new(
        "Tenant",
        vec![
            FieldDef::new("id", FieldKind::Integer).primary_key(),
            FieldDef::new("active", FieldKind::Bool).default_value(true),
            FieldDef::new("creation_date", FieldKind::Timestamp).default_value(EPOCH),
        ],
    )
}

pub fn config() -> TableDef {
    TableDef::new(
        "Config",
        vec![
            FieldDef::new("tid", FieldKind::Integer).default_value(1).primary_key(),
            FieldDef::new("var_name", FieldKind::Text).primary_key(),
            FieldDef::new("value", FieldKind::Json),
        ],
    )
}

pub fn config_l10n() -> TableDef {
    TableDef::new(
        "ConfigL10N",
        vec![
            FieldDef::new("tid", FieldKind::Integer).default_value(1).primary_key(),
            FieldDef::new("lang", FieldKind::Text).primary_key(),
            FieldDef::new("var_name", FieldKind::Text).primary_key(),
            FieldDef::new("value", FieldKind::Text).default_value(""),
        ],
    )
}

pub fn enabled_language() -> TableDef {
    TableDef::new(
        "EnabledLanguage",
        vec![
            FieldDef::new("tid", FieldKind::Integer).default_value(1).primary_key(),
            FieldDef::new("name", FieldKind::Text).primary_key(),
        ],
    )
}

pub fn user() -> TableDef {
    TableDef::new(
        "User",
        vec![
            FieldDef::new("id", FieldKind::Text).primary_key(),
            FieldDef::new("tid", FieldKind::Integer).default_value(1),
            FieldDef::new("username", FieldKind::Text),
            FieldDef::new("password", FieldKind::Text).default_value(""),
            FieldDef::new("role", FieldKind::Text).default_value("receiver"),
            FieldDef::new("state", FieldKind::Text).default_value("enabled"),
            FieldDef::new("language", FieldKind::Text).default_value("en"),
            FieldDef::new("email", FieldKind::Text).default_value(""),
            FieldDef::new("two_factor_enable", FieldKind::Bool).default_value(false),
            FieldDef::new("creation_date", FieldKind::Timestamp).default_value(EPOCH),
        ],
    )
}

pub fn context() -> TableDef {
    TableDef::new(
        "Context",
        vec![
            FieldDef::new("id", FieldKind::Text).primary_key(),
            FieldDef::new("tid", FieldKind::Integer).default_value(1),
            FieldDef::new("name", FieldKind::Json).default_value("{}"),
            FieldDef::new("description", FieldKind::Json).default_value("{}"),
            FieldDef::new("show_recipients_in_alphabetical_order", FieldKind::Bool)
                .default_value(false),
            FieldDef::new("presentation_order", FieldKind::Integer).default_value(0),
        ],
    )
}

pub fn internal_tip() -> TableDef {
    TableDef::new(
        "InternalTip",
        vec![
            FieldDef::new("id", FieldKind::Text).primary_key(),
            FieldDef::new("tid", FieldKind::Integer).default_value(1),
            FieldDef::new("context_id", FieldKind::Text),
            FieldDef::new("creation_date", FieldKind::Timestamp).default_value(EPOCH),
            FieldDef::new("progressive", FieldKind::Integer).default_value(0),
            FieldDef::new("status", FieldKind::Text).nullable(),
            FieldDef::new("substatus", FieldKind::Text).nullable(),
        ],
    )
}

pub fn submission_status() -> TableDef {
    TableDef::new(
        "SubmissionStatus",
        vec![
            FieldDef::new("id", FieldKind::Text).primary_key(),
            FieldDef::new("tid", FieldKind::Integer).default_value(1),
            FieldDef::new("label", FieldKind::Json).default_value("{}"),
            FieldDef::new("system_defined", FieldKind::Bool).default_value(false),
            FieldDef::new("system_usage", FieldKind::Text).default_value(""),
            FieldDef::new("presentation_order", FieldKind::Integer).default_value(0),
        ],
    )
}

/// The schema databases at the current version are created with.
pub fn current_schema() -> SchemaSet {
    SchemaSet::new()
        .with(tenant())
        .with(config())
        .with(config_l10n())
        .with(enabled_language())
        .with(user())
        .with(context())
        .with(internal_tip())
        .with(submission_status())
}
