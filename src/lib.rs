#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en");

pub mod app;
pub mod appdata;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod migration;
pub mod schema;
pub mod security;
pub mod store;

pub use config::Config;
pub use error::{MigrationError, StrataError};
pub use migration::{MigrationOutcome, Migrator};
pub use schema::SchemaRegistry;
