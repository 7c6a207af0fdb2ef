use crate::app::startup::{StartupAction, prepare_database};
use crate::app::status::render_status;
use crate::catalog;
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::error::{MigrationError, Result, StrataError};
use crate::migration::{MigrationOutcome, Migrator};
use crate::schema::{SchemaRegistry, TableDef};
use crate::store::detect_stored_version;
use anyhow::anyhow;

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Migrate { from } => {
            let migrator = Migrator::from_config(&config)?;
            let starting = match from {
                Some(version) => version,
                None => detect_stored_version(migrator.layout())
                    .await
                    .map_err(MigrationError::Detection)?
                    .ok_or_else(|| {
                        MigrationError::LiveDatabaseMissing(
                            migrator.layout().final_db().display().to_string(),
                        )
                    })?,
            };
            let outcome = migrator.run(starting).await?;
            println!("{}", describe_outcome(&outcome));
            Ok(())
        }
        Commands::Init => {
            let migrator = Migrator::from_config(&config)?;
            match prepare_database(&migrator).await? {
                StartupAction::Initialized(path) => {
                    println!("created {}", path.display());
                }
                StartupAction::Migrated(outcome) => println!("{}", describe_outcome(&outcome)),
                StartupAction::UpToDate(version) => {
                    println!("database already at version {version}");
                }
            }
            Ok(())
        }
        Commands::Status => {
            let registry = catalog::registry()?;
            let stored = detect_stored_version(&config.layout())
                .await
                .map_err(MigrationError::Detection)?;
            println!("{}", render_status(&config, &registry, stored));
            Ok(())
        }
        Commands::Schema {
            version,
            table,
            check,
        } => {
            let registry = catalog::registry()?;
            if check {
                return check_drift(&registry);
            }
            let version = version.unwrap_or(registry.current_version());
            print_schema(&registry, version, table.as_deref())
        }
    }
}

fn describe_outcome(outcome: &MigrationOutcome) -> String {
    if outcome.up_to_date() {
        format!("database already at version {}", outcome.to_version)
    } else {
        format!(
            "migrated {} from version {} to version {} in {} steps",
            outcome.database.display(),
            outcome.from_version,
            outcome.to_version,
            outcome.steps.len()
        )
    }
}

fn print_schema(registry: &SchemaRegistry, version: u32, table: Option<&str>) -> Result<()> {
    let schema = registry.target_schema(version).ok_or_else(|| {
        anyhow!(
            "version {version} is outside the supported range {}..={}",
            registry.first_version(),
            registry.current_version()
        )
    })?;

    let tables: Vec<&TableDef> = match table {
        Some(name) => {
            let def = schema
                .get(name)
                .ok_or_else(|| anyhow!("table {name} does not exist at version {version}"))?;
            vec![&**def]
        }
        None => schema.tables().map(|def| &**def).collect(),
    };
    let json = serde_json::to_string_pretty(&tables).map_err(anyhow::Error::from)?;
    println!("{json}");
    Ok(())
}

fn check_drift(registry: &SchemaRegistry) -> Result<()> {
    let drift = registry.drift();
    let report: Vec<serde_json::Value> = drift
        .iter()
        .map(|(table, reason)| serde_json::json!({ "table": table, "reason": reason }))
        .collect();
    let json = serde_json::to_string_pretty(&report).map_err(anyhow::Error::from)?;
    println!("{json}");

    if drift.is_empty() {
        Ok(())
    } else {
        Err(StrataError::Other(anyhow!(
            "registry and current schema disagree on {} tables",
            drift.len()
        )))
    }
}
