use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Working directory holding the live database - computed, not serialized
    #[serde(skip)]
    pub working_path: PathBuf,
    /// Path to strata.toml - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub migration: MigrationConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            working_path: PathBuf::from("."),
            config_path: PathBuf::from(super::CONFIG_FILE_NAME),
            database: DatabaseConfig::default(),
            migration: MigrationConfig::default(),
            log: LogConfig::default(),
        }
    }
}

// ── Database files ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Live database file name inside the working path (default: strata.db)
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Directory of the legacy per-version files (default: db)
    #[serde(default = "default_legacy_dir")]
    pub legacy_dir: String,
    /// Legacy per-version file prefix: `<prefix>-<version>.db` (default: strata)
    #[serde(default = "default_legacy_prefix")]
    pub legacy_prefix: String,
    /// Versions strictly below this one live in the legacy per-version layout
    #[serde(default = "default_legacy_layout_before")]
    pub legacy_layout_before: Option<u32>,
}

fn default_file_name() -> String {
    "strata.db".into()
}

fn default_legacy_dir() -> String {
    "db".into()
}

fn default_legacy_prefix() -> String {
    "strata".into()
}

#[allow(clippy::unnecessary_wraps)]
fn default_legacy_layout_before() -> Option<u32> {
    Some(41)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            legacy_dir: default_legacy_dir(),
            legacy_prefix: default_legacy_prefix(),
            legacy_layout_before: default_legacy_layout_before(),
        }
    }
}

// ── Migration run ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Staging directory, relative to the working path (default: tmp/migration)
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,
    /// Random overwrite passes before an intermediate file is unlinked
    #[serde(default = "default_wipe_passes")]
    pub wipe_passes: u32,
}

fn default_staging_dir() -> String {
    "tmp/migration".into()
}

fn default_wipe_passes() -> u32 {
    1
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            wipe_passes: default_wipe_passes(),
        }
    }
}

// ── Logging ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Max tracing level: error, warn, info, debug, trace (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
