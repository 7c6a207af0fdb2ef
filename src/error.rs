use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `strata`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide how to report a failure; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum StrataError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Schema registry ─────────────────────────────────────────────────
    #[error("schema: {0}")]
    Schema(#[from] SchemaError),

    // ── Migration ───────────────────────────────────────────────────────
    #[error("migration: {0}")]
    Migration(#[from] MigrationError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Schema registry errors ─────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid version range: first {first} > current {current}")]
    InvalidRange { first: u32, current: u32 },

    #[error("table {table}: expected {expected} revisions, got {actual}")]
    RevisionCount {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("table {table}: version {version} outside {first}..={current}")]
    VersionOutOfRange {
        table: String,
        version: u32,
        first: u32,
        current: u32,
    },

    #[error("table {0} registered twice")]
    DuplicateTable(String),

    #[error("table {table}: explicit definition is named {found}")]
    NameMismatch { table: String, found: String },

    #[error("table {0} has no fields")]
    EmptyTable(String),
}

// ─── Migration errors ───────────────────────────────────────────────────────

/// Fatal conditions of a migration run. None of them is retried.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(
        "migrations from database version {version} are no longer supported (first supported: {first}); \
upgrade through an intermediate release first"
    )]
    UnsupportedStartingVersion { version: u32, first: u32 },

    #[error("database version {version} is newer than the supported version {current}")]
    NewerThanSupported { version: u32, current: u32 },

    #[error(
        "cannot complete the upgrade because support for some enabled languages is incomplete ({})",
        languages.join(", ")
    )]
    LanguageCompatibility { languages: Vec<String> },

    #[error("live database not found at {0}")]
    LiveDatabaseMissing(String),

    #[error("could not determine the stored schema version")]
    Detection(#[source] anyhow::Error),

    #[error("no step driver registered for version {version}")]
    MissingStepDriver { version: u32 },

    #[error("prologue of step to version {version} failed")]
    StepPrologue {
        version: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("migration of table {table} to version {version} failed")]
    TableMigration {
        table: String,
        version: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("epilogue of step to version {version} failed")]
    StepEpilogue {
        version: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "integrity check failed on count equality for table {table} at version {version}: {actual} != {expected}"
    )]
    IntegrityMismatch {
        table: String,
        version: u32,
        expected: u64,
        actual: u64,
    },

    #[error("post-migration normalization failed")]
    Normalization(#[source] anyhow::Error),

    #[error("staging workspace: {0}")]
    Workspace(#[source] anyhow::Error),

    #[error("publishing migrated database failed")]
    Publish(#[source] anyhow::Error),

    #[error("schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    /// `true` when the run was refused before any file was created or mutated.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedStartingVersion { .. }
                | Self::NewerThanSupported { .. }
                | Self::LanguageCompatibility { .. }
                | Self::LiveDatabaseMissing(_)
                | Self::Detection(_)
        )
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, StrataError>;
