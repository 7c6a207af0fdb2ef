//! Startup trigger: bring the stored database to the current version.

use crate::error::MigrationError;
use crate::migration::{MigrationOutcome, Migrator};
use crate::store::detect_stored_version;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupAction {
    /// No database existed; a current one was created.
    Initialized(PathBuf),
    Migrated(MigrationOutcome),
    UpToDate(u32),
}

pub async fn prepare_database(migrator: &Migrator) -> Result<StartupAction, MigrationError> {
    let stored = detect_stored_version(migrator.layout())
        .await
        .map_err(MigrationError::Detection)?;
    let current = migrator.registry().current_version();

    match stored {
        None => {
            info!("no database found, creating version {current}");
            migrator.initialize().await.map(StartupAction::Initialized)
        }
        Some(version) if version < current => {
            info!(stored = version, current, "database needs migration");
            migrator.run(version).await.map(StartupAction::Migrated)
        }
        Some(version) if version == current => Ok(StartupAction::UpToDate(version)),
        Some(version) => Err(MigrationError::NewerThanSupported { version, current }),
    }
}
