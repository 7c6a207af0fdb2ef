//! Historical table shapes that are no longer current.

use super::current::EPOCH;
use crate::schema::{FieldDef, FieldKind, TableDef};

pub fn node_v38() -> TableDef {
    TableDef::new(
        "Node",
        vec![
            FieldDef::new("id", FieldKind::Integer).primary_key(),
            FieldDef::new("name", FieldKind::Text).default_value(""),
            FieldDef::new("default_language", FieldKind::Text).default_value("en"),
            FieldDef::new("enable_signup", FieldKind::Bool).default_value(false),
        ],
    )
}

pub fn node_v40() -> TableDef {
    let mut def = node_v38();
    def.fields
        .push(FieldDef::new("threshold", FieldKind::Integer).default_value(0));
    def
}

pub fn config_v38() -> TableDef {
    TableDef::new(
        "Config",
        vec![
            FieldDef::new("var_group", FieldKind::Text).primary_key(),
            FieldDef::new("var_name", FieldKind::Text).primary_key(),
            FieldDef::new("value", FieldKind::Json),
        ],
    )
}

pub fn config_l10n_v38() -> TableDef {
    TableDef::new(
        "ConfigL10N",
        vec![
            FieldDef::new("lang", FieldKind::Text).primary_key(),
            FieldDef::new("var_group", FieldKind::Text).primary_key(),
            FieldDef::new("var_name", FieldKind::Text).primary_key(),
            FieldDef::new("value", FieldKind::Text).default_value(""),
        ],
    )
}

pub fn enabled_language_v38() -> TableDef {
    TableDef::new(
        "EnabledLanguage",
        vec![FieldDef::new("name", FieldKind::Text).primary_key()],
    )
}

pub fn user_v38() -> TableDef {
    TableDef::new(
        "User",
        vec![
            FieldDef::new("id", FieldKind::Text).primary_key(),
            FieldDef::new("username", FieldKind::Text),
            FieldDef::new("password", FieldKind::Text).default_value(""),
            FieldDef::new("role", FieldKind::Text).default_value("receiver"),
            FieldDef::new("state", FieldKind::Text).default_value("enabled"),
            FieldDef::new("mail_address", FieldKind::Text).default_value(""),
            FieldDef::new("creation_date", FieldKind::Timestamp).default_value(EPOCH),
        ],
    )
}

/// Adds the preferred interface language.
pub fn user_v39() -> TableDef {
    let mut def = user_v38();
    def.fields.insert(
        5,
        FieldDef::new("language", FieldKind::Text).default_value("en"),
    );
    def
}

/// Adds tenant scoping.
pub fn user_v41() -> TableDef {
    let mut def = user_v39();
    def.fields.insert(
        1,
        FieldDef::new("tid", FieldKind::Integer).default_value(1),
    );
    def
}

/// Adds two-factor authentication.
pub fn user_v42() -> TableDef {
    let mut def = user_v41();
    let at = def.fields.len() - 1;
    def.fields.insert(
        at,
        FieldDef::new("two_factor_enable", FieldKind::Bool).default_value(false),
    );
    def
}

pub fn context_v38() -> TableDef {
    TableDef::new(
        "Context",
        vec![
            FieldDef::new("id", FieldKind::Text).primary_key(),
            FieldDef::new("name", FieldKind::Json).default_value("{}"),
            FieldDef::new("description", FieldKind::Json).default_value("{}"),
            FieldDef::new("show_recipients_in_alphabetical_order", FieldKind::Bool)
                .default_value(false),
        ],
    )
}

pub fn context_v41() -> TableDef {
    let mut def = context_v38();
    def.fields.insert(
        1,
        FieldDef::new("tid", FieldKind::Integer).default_value(1),
    );
    def
}

pub fn internal_tip_v38() -> TableDef {
    TableDef::new(
        "InternalTip",
        vec![
            FieldDef::new("id", FieldKind::Text).primary_key(),
            FieldDef::new("context_id", FieldKind::Text),
            FieldDef::new("creation_date", FieldKind::Timestamp).default_value(EPOCH),
            FieldDef::new("progressive", FieldKind::Integer).default_value(0),
        ],
    )
}

pub fn internal_tip_v41() -> TableDef {
    let mut def = internal_tip_v38();
    def.fields.insert(
        1,
        FieldDef::new("tid", FieldKind::Integer).default_value(1),
    );
    def
}
