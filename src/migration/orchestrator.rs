use super::driver::{StepContext, StepDriver};
use super::normalize::PostMigrationNormalizer;
use super::preflight;
use super::steps::DriverRegistry;
use super::verify::{IntegrityCheck, IntegrityReport, verify_step};
use super::workspace::StagingWorkspace;
use crate::appdata::{BundledDefaults, DefaultsProvider};
use crate::catalog;
use crate::config::{Config, StoreLayout};
use crate::error::MigrationError;
use crate::schema::{SchemaRegistry, SchemaSet};
use crate::security::{overwrite_and_remove, wipe_dir};
use crate::store::{Session, SessionMode, create_database};
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub from_version: u32,
    pub to_version: u32,
    pub steps: Vec<IntegrityReport>,
    /// Path of the published database.
    pub database: PathBuf,
}

impl MigrationOutcome {
    pub fn up_to_date(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Drives a database from its stored version up to the current one.
pub struct Migrator {
    layout: StoreLayout,
    registry: Arc<SchemaRegistry>,
    drivers: DriverRegistry,
    defaults: Arc<dyn DefaultsProvider>,
    app_version: String,
    wipe_passes: u32,
}

impl Migrator {
    pub fn new(
        layout: StoreLayout,
        registry: Arc<SchemaRegistry>,
        drivers: DriverRegistry,
        defaults: Arc<dyn DefaultsProvider>,
    ) -> Self {
        Self {
            layout,
            registry,
            drivers,
            defaults,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            wipe_passes: 1,
        }
    }

    /// Migrator over the bundled catalog, drivers and defaults.
    pub fn from_config(config: &Config) -> Result<Self, MigrationError> {
        let registry = Arc::new(catalog::registry()?);
        Ok(Self::new(
            config.layout(),
            registry,
            DriverRegistry::builtin(),
            Arc::new(BundledDefaults),
        )
        .with_wipe_passes(config.migration.wipe_passes))
    }

    pub fn with_app_version(mut self, version: &str) -> Self {
        self.app_version = version.to_string();
        self
    }

    pub fn with_wipe_passes(mut self, passes: u32) -> Self {
        self.wipe_passes = passes.max(1);
        self
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn normalizer(&self) -> PostMigrationNormalizer {
        PostMigrationNormalizer::new(Arc::clone(&self.defaults), &self.app_version)
    }

    fn current_schema(&self) -> Arc<SchemaSet> {
        Arc::new(self.registry.current_schema().clone())
    }

    /// Create a fresh database at the current version and seed its defaults.
    pub async fn initialize(&self) -> Result<PathBuf, MigrationError> {
        let path = self.layout.final_db();
        let current = self.registry.current_version();
        let schema = self.current_schema();

        create_database(&path, &schema)
            .await
            .map_err(MigrationError::Publish)?;
        if let Err(err) = self.normalizer().initialize(&path, schema, current).await {
            if let Err(cleanup) = overwrite_and_remove(&path, self.wipe_passes) {
                warn!(path = %path.display(), "could not remove partial database: {cleanup:#}");
            }
            return Err(err);
        }
        info!(version = current, path = %path.display(), "initialized new database");
        Ok(path)
    }

    /// Migrate the live database stored at `starting` to the current version.
    ///
    /// The live file is only read until the final publication; on any error
    /// it is left untouched. The staging workspace is erased on every path.
    /// Once the migrated file is published, failures to erase the previous
    /// files or the workspace are logged and the run still succeeds.
    pub async fn run(&self, starting: u32) -> Result<MigrationOutcome, MigrationError> {
        preflight::check_version(&self.registry, starting)?;
        let live = self.layout.live_db(starting);
        preflight::check_languages(&live, &self.defaults.supported_language_codes()).await?;

        let current = self.registry.current_version();
        if starting == current {
            info!(version = current, "database already at current version");
            return Ok(MigrationOutcome {
                from_version: starting,
                to_version: current,
                steps: Vec::new(),
                database: live,
            });
        }

        let mut workspace = StagingWorkspace::create(self.layout.staging_dir(), self.wipe_passes)
            .map_err(MigrationError::Workspace)?;

        let result = self.migrate_in(&workspace, starting, &live).await;
        let teardown = workspace.teardown();
        settle(starting, result, teardown)
    }

    async fn migrate_in(
        &self,
        workspace: &StagingWorkspace,
        starting: u32,
        live: &Path,
    ) -> Result<MigrationOutcome, MigrationError> {
        workspace.seed(live).map_err(MigrationError::Workspace)?;

        let current = self.registry.current_version();
        let mut steps = Vec::new();
        let mut version = starting;
        while version < current {
            steps.push(self.step(workspace, version).await?);
            version += 1;
        }

        let migrated = workspace.new_db();
        self.normalizer()
            .run(&migrated, self.current_schema(), current)
            .await?;

        let database = self.publish(&migrated).map_err(MigrationError::Publish)?;
        if let Err(err) = self.remove_superseded(live) {
            warn!(
                path = %database.display(),
                "database published, but removing the previous files failed: {err:#}"
            );
        }
        info!(from = starting, to = current, path = %database.display(), "migration completed");

        Ok(MigrationOutcome {
            from_version: starting,
            to_version: current,
            steps,
            database,
        })
    }

    async fn step(
        &self,
        workspace: &StagingWorkspace,
        version: u32,
    ) -> Result<IntegrityReport, MigrationError> {
        let target_version = version + 1;
        info!("updating database from version {version} to version {target_version}");

        if !self.drivers.contains(target_version) {
            return Err(MigrationError::MissingStepDriver {
                version: target_version,
            });
        }

        workspace.rotate().map_err(MigrationError::Workspace)?;
        workspace.discard_new().map_err(MigrationError::Workspace)?;

        let source_schema = self.schema_for(version, false)?;
        let target_schema = self.schema_for(target_version, true)?;
        create_database(&workspace.new_db(), &target_schema)
            .await
            .map_err(MigrationError::Workspace)?;

        let prologue_error = |source: anyhow::Error| {
            error!(version = target_version, "failed to open step sessions: {source:#}");
            MigrationError::StepPrologue {
                version: target_version,
                source,
            }
        };
        let source = Session::open(&workspace.old_db(), source_schema, SessionMode::ReadOnly)
            .await
            .map_err(prologue_error)?;
        let target = Session::open(&workspace.new_db(), target_schema, SessionMode::ReadWrite)
            .await
            .map_err(prologue_error)?;
        let ctx = StepContext::open(version, Arc::clone(&self.registry), source, target)
            .await
            .map_err(prologue_error)?;

        let mut driver = self
            .drivers
            .instantiate(target_version, ctx)
            .ok_or(MigrationError::MissingStepDriver {
                version: target_version,
            })?;

        let result = drive(driver.as_mut(), target_version).await;
        if let Err(err) = driver.close().await {
            warn!(version = target_version, "closing step sessions failed: {err:#}");
        }
        drop(driver);

        let checks = result?;
        verify_step(&workspace.new_db(), target_version, &checks).await
    }

    fn schema_for(&self, version: u32, target: bool) -> Result<Arc<SchemaSet>, MigrationError> {
        let schema = if target {
            self.registry.target_schema(version)
        } else {
            self.registry.schema_at(version)
        };
        schema
            .cloned()
            .map(Arc::new)
            .ok_or(MigrationError::UnsupportedStartingVersion {
                version,
                first: self.registry.first_version(),
            })
    }

    /// Replace the final database with `migrated` through a rename in the
    /// destination directory. A failed attempt leaves no copy behind.
    fn publish(&self, migrated: &Path) -> anyhow::Result<PathBuf> {
        let final_db = self.layout.final_db();
        let staged = final_db.with_extension("db.publish");

        let published = fs::copy(migrated, &staged)
            .with_context(|| format!("copy migrated database to {}", staged.display()))
            .and_then(|_| {
                fs::File::open(&staged)
                    .and_then(|f| f.sync_all())
                    .with_context(|| format!("sync {}", staged.display()))
            })
            .and_then(|()| {
                fs::rename(&staged, &final_db)
                    .with_context(|| format!("replace {}", final_db.display()))
            });

        if let Err(err) = published {
            if let Err(cleanup) = overwrite_and_remove(&staged, self.wipe_passes) {
                error!(path = %staged.display(), "could not erase unpublished copy: {cleanup:#}");
            }
            return Err(err);
        }
        Ok(final_db)
    }

    /// Erase the pre-migration file when it lived elsewhere, then the legacy
    /// layout directory.
    fn remove_superseded(&self, live: &Path) -> anyhow::Result<()> {
        if live != self.layout.final_db() {
            overwrite_and_remove(live, self.wipe_passes)?;
        }
        let legacy_dir = self.layout.legacy_dir();
        if legacy_dir.is_dir() {
            info!(dir = %legacy_dir.display(), "removing legacy database directory");
            wipe_dir(&legacy_dir, self.wipe_passes)?;
        }
        Ok(())
    }
}

/// Final result of a run once the workspace is gone. Teardown failures after
/// a successful publish are logged; the published database stands.
fn settle(
    starting: u32,
    result: Result<MigrationOutcome, MigrationError>,
    teardown: anyhow::Result<()>,
) -> Result<MigrationOutcome, MigrationError> {
    match (result, teardown) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(outcome), Err(err)) => {
            warn!(
                path = %outcome.database.display(),
                "database published, but staging teardown failed: {err:#}"
            );
            Ok(outcome)
        }
        (Err(err), teardown) => {
            if let Err(cleanup) = teardown {
                error!("staging teardown failed: {cleanup:#}");
            }
            error!("migration from version {starting} aborted: {err}");
            Err(err)
        }
    }
}

/// Prologue, every shared table with its own commit, then epilogue.
async fn drive(
    driver: &mut dyn StepDriver,
    version: u32,
) -> Result<Vec<IntegrityCheck>, MigrationError> {
    if let Err(source) = driver.prologue().await {
        error!(version, "step prologue failed: {source:#}");
        return Err(MigrationError::StepPrologue { version, source });
    }

    let tables = driver.context().migrated_tables();
    for table in &tables {
        let migrated = match driver.migrate_table(table).await {
            Ok(()) => driver.commit().await,
            Err(err) => Err(err),
        };
        if let Err(source) = migrated {
            error!(version, table = %table, "failure while migrating table {table}: {source:#}");
            return Err(MigrationError::TableMigration {
                table: table.clone(),
                version,
                source,
            });
        }
    }

    let finished = match driver.epilogue().await {
        Ok(()) => driver.commit().await,
        Err(err) => Err(err),
    };
    if let Err(source) = finished {
        error!(version, "step epilogue failed: {source:#}");
        return Err(MigrationError::StepEpilogue { version, source });
    }

    Ok(tables
        .into_iter()
        .map(|table| IntegrityCheck {
            expected: driver.expected_count(&table).unwrap_or_default(),
            policy: driver.count_policy(&table),
            table,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> MigrationOutcome {
        MigrationOutcome {
            from_version: 40,
            to_version: 45,
            steps: Vec::new(),
            database: PathBuf::from("/srv/strata/strata.db"),
        }
    }

    #[test]
    fn teardown_failure_after_publish_keeps_the_outcome() {
        let settled = settle(40, Ok(outcome()), Err(anyhow::anyhow!("busy"))).unwrap();
        assert_eq!(settled, outcome());
    }

    #[test]
    fn step_error_wins_over_teardown_error() {
        let err = settle(
            40,
            Err(MigrationError::MissingStepDriver { version: 41 }),
            Err(anyhow::anyhow!("busy")),
        )
        .unwrap_err();
        assert!(matches!(err, MigrationError::MissingStepDriver { version: 41 }));
    }

    #[test]
    fn clean_run_settles_to_its_outcome() {
        assert_eq!(settle(40, Ok(outcome()), Ok(())).unwrap(), outcome());
    }
}
