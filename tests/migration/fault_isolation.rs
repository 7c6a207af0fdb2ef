use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use super::store_harness::{APP_VERSION, Deployment, Seed, seed_live};
use strata::MigrationError;
use strata::appdata::{AppData, BundledDefaults, DefaultsProvider};
use strata::catalog::FIRST_SUPPORTED_VERSION;
use strata::migration::{DriverRegistry, Migrator, StepContext, StepDriver, StepFuture};
use strata::store::{SessionMode, count_rows, open_pool};

/// Carries tables over but fails on `fail_on`, first recording how many
/// `User` rows the step had already committed.
struct FailOnTable {
    ctx: StepContext,
    fail_on: &'static str,
    committed_users: Arc<Mutex<Option<u64>>>,
}

impl StepDriver for FailOnTable {
    fn context(&self) -> &StepContext {
        &self.ctx
    }

    fn context_mut(&mut self) -> &mut StepContext {
        &mut self.ctx
    }

    fn migrate_table<'a>(&'a mut self, table: &'a str) -> StepFuture<'a, ()> {
        Box::pin(async move {
            if table == self.fail_on {
                let pool = open_pool(self.ctx.target.path(), SessionMode::ReadOnly).await?;
                let users = count_rows(&pool, "User").await?;
                pool.close().await;
                *self.committed_users.lock().unwrap() = Some(users);
                anyhow::bail!("simulated failure while migrating {table}");
            }
            self.ctx.carry_over(table).await.map(|_| ())
        })
    }
}

/// Writes every `User` row but the last one.
struct DropsLastUser {
    ctx: StepContext,
}

impl StepDriver for DropsLastUser {
    fn context(&self) -> &StepContext {
        &self.ctx
    }

    fn context_mut(&mut self) -> &mut StepContext {
        &mut self.ctx
    }

    fn migrate_table<'a>(&'a mut self, table: &'a str) -> StepFuture<'a, ()> {
        Box::pin(async move {
            if table != "User" {
                return self.ctx.carry_over(table).await.map(|_| ());
            }
            let def = self.ctx.target.table(table)?;
            let mut rows = self.ctx.source.rows(table).await?;
            rows.pop();
            for row in rows {
                self.ctx.target.insert(table, &def.project(&row)).await?;
            }
            Ok(())
        })
    }
}

/// Fails in the hook named by `fail_in` and carries everything over otherwise.
struct FailingHook {
    ctx: StepContext,
    fail_in: &'static str,
}

impl StepDriver for FailingHook {
    fn context(&self) -> &StepContext {
        &self.ctx
    }

    fn context_mut(&mut self) -> &mut StepContext {
        &mut self.ctx
    }

    fn prologue(&mut self) -> StepFuture<'_, ()> {
        Box::pin(async move {
            anyhow::ensure!(self.fail_in != "prologue", "simulated prologue failure");
            Ok(())
        })
    }

    fn epilogue(&mut self) -> StepFuture<'_, ()> {
        Box::pin(async move {
            anyhow::ensure!(self.fail_in != "epilogue", "simulated epilogue failure");
            Ok(())
        })
    }
}

/// Ships the bundled languages but cannot load its default content.
struct BrokenDefaults;

impl DefaultsProvider for BrokenDefaults {
    fn load_defaults(&self) -> anyhow::Result<AppData> {
        anyhow::bail!("defaults bundle unreadable")
    }

    fn supported_language_codes(&self) -> BTreeSet<String> {
        BundledDefaults.supported_language_codes()
    }
}

async fn run_with_failing_hook(hook: &'static str) -> (Deployment, MigrationError) {
    let deployment = Deployment::new();
    let live = seed_live(&deployment.layout(), FIRST_SUPPORTED_VERSION, &Seed::default()).await;
    let before = std::fs::read(&live).unwrap();

    let drivers = DriverRegistry::builtin().with(FIRST_SUPPORTED_VERSION + 1, move |ctx| {
        Box::new(FailingHook { ctx, fail_in: hook })
    });
    let err = deployment
        .migrator_with(drivers)
        .run(FIRST_SUPPORTED_VERSION)
        .await
        .unwrap_err();

    assert_eq!(std::fs::read(&live).unwrap(), before);
    (deployment, err)
}

#[tokio::test]
async fn failing_prologue_aborts_before_any_table() {
    let (deployment, err) = run_with_failing_hook("prologue").await;

    assert!(matches!(
        err,
        MigrationError::StepPrologue { version, .. } if version == FIRST_SUPPORTED_VERSION + 1
    ));
    assert!(!err.is_preflight());
    assert!(!deployment.layout().final_db().exists());
    assert!(!deployment.staging_dir().exists());
}

#[tokio::test]
async fn failing_epilogue_aborts_the_step() {
    let (deployment, err) = run_with_failing_hook("epilogue").await;

    assert!(matches!(
        err,
        MigrationError::StepEpilogue { version, .. } if version == FIRST_SUPPORTED_VERSION + 1
    ));
    assert!(!deployment.layout().final_db().exists());
    assert!(!deployment.staging_dir().exists());
}

#[tokio::test]
async fn normalization_failure_leaves_live_database_untouched() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    let live = seed_live(&layout, FIRST_SUPPORTED_VERSION, &Seed::default()).await;
    let before = std::fs::read(&live).unwrap();

    let migrator = Migrator::new(
        layout.clone(),
        Deployment::registry(),
        DriverRegistry::builtin(),
        Arc::new(BrokenDefaults),
    )
    .with_app_version(APP_VERSION);
    let err = migrator.run(FIRST_SUPPORTED_VERSION).await.unwrap_err();

    assert!(matches!(err, MigrationError::Normalization(_)), "{err}");
    assert_eq!(std::fs::read(&live).unwrap(), before);
    assert!(!layout.final_db().exists());
    assert!(!deployment.staging_dir().exists());
}

#[tokio::test]
async fn failing_table_keeps_earlier_tables_committed_and_live_untouched() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    let live = seed_live(&layout, FIRST_SUPPORTED_VERSION, &Seed::default()).await;
    let before = std::fs::read(&live).unwrap();

    let committed_users = Arc::new(Mutex::new(None));
    let observed = Arc::clone(&committed_users);
    let drivers = DriverRegistry::builtin().with(FIRST_SUPPORTED_VERSION + 1, move |ctx| {
        Box::new(FailOnTable {
            ctx,
            fail_on: "Context",
            committed_users: Arc::clone(&observed),
        })
    });

    let err = deployment
        .migrator_with(drivers)
        .run(FIRST_SUPPORTED_VERSION)
        .await
        .unwrap_err();

    match &err {
        MigrationError::TableMigration { table, version, .. } => {
            assert_eq!(table, "Context");
            assert_eq!(*version, FIRST_SUPPORTED_VERSION + 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_preflight());
    assert_eq!(*committed_users.lock().unwrap(), Some(3));
    assert_eq!(std::fs::read(&live).unwrap(), before);
    assert!(!layout.final_db().exists());
    assert!(!deployment.staging_dir().exists());
}

#[tokio::test]
async fn strict_count_mismatch_aborts_the_run() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    let live = seed_live(&layout, FIRST_SUPPORTED_VERSION, &Seed::default()).await;
    let before = std::fs::read(&live).unwrap();

    let drivers = DriverRegistry::builtin()
        .with(40, |ctx| Box::new(DropsLastUser { ctx }));

    let err = deployment
        .migrator_with(drivers)
        .run(FIRST_SUPPORTED_VERSION)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MigrationError::IntegrityMismatch { ref table, version: 40, expected: 3, actual: 2 } if table == "User"
    ));
    assert_eq!(std::fs::read(&live).unwrap(), before);
    assert!(!deployment.staging_dir().exists());
}

#[tokio::test]
async fn missing_driver_stops_before_the_step() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    let live = seed_live(&layout, FIRST_SUPPORTED_VERSION, &Seed::default()).await;
    let before = std::fs::read(&live).unwrap();

    let drivers = DriverRegistry::new().carry_over(FIRST_SUPPORTED_VERSION + 1);
    let err = deployment
        .migrator_with(drivers)
        .run(FIRST_SUPPORTED_VERSION)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MigrationError::MissingStepDriver { version } if version == FIRST_SUPPORTED_VERSION + 2
    ));
    assert_eq!(std::fs::read(&live).unwrap(), before);
    assert!(!deployment.staging_dir().exists());
}
