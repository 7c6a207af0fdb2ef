use super::store_harness::{Deployment, Seed, count, seed_live};
use strata::MigrationError;
use strata::app::{StartupAction, prepare_database};
use strata::catalog::CURRENT_VERSION;
use strata::store::detect_stored_version;

#[tokio::test]
async fn startup_detects_and_migrates_stored_version() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    seed_live(&layout, 40, &Seed::default()).await;
    assert_eq!(detect_stored_version(&layout).await.unwrap(), Some(40));

    let action = prepare_database(&deployment.migrator()).await.unwrap();
    match action {
        StartupAction::Migrated(outcome) => {
            assert_eq!(outcome.from_version, 40);
            assert_eq!(outcome.steps.len(), (CURRENT_VERSION - 40) as usize);
        }
        other => panic!("unexpected action: {other:?}"),
    }

    assert_eq!(detect_stored_version(&layout).await.unwrap(), Some(CURRENT_VERSION));
    assert_eq!(count(&layout.final_db(), "User").await, 3);
}

#[tokio::test]
async fn startup_refuses_database_from_newer_release() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    let db = seed_live(&layout, CURRENT_VERSION, &Seed::default()).await;

    let pool = strata::store::open_pool(&db, strata::store::SessionMode::ReadWrite)
        .await
        .unwrap();
    sqlx::query("UPDATE \"Config\" SET value = '99' WHERE tid = 1 AND var_name = 'version_db'")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let err = prepare_database(&deployment.migrator()).await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::NewerThanSupported { version: 99, current } if current == CURRENT_VERSION
    ));
}
