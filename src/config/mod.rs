mod env_overrides;
mod layout;
mod loader;
mod types;

pub use layout::StoreLayout;
pub use types::{Config, DatabaseConfig, LogConfig, MigrationConfig};

pub const CONFIG_FILE_NAME: &str = "strata.toml";
