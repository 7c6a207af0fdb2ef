use serde_json::json;

use super::store_harness::{
    APP_VERSION, Deployment, Seed, column_names, config_value, count, fetch_strings, seed_live,
};
use strata::catalog::{CURRENT_VERSION, FIRST_SUPPORTED_VERSION};

#[tokio::test]
async fn oldest_supported_database_reaches_current_version() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    seed_live(&layout, FIRST_SUPPORTED_VERSION, &Seed::default()).await;

    let outcome = deployment
        .migrator()
        .run(FIRST_SUPPORTED_VERSION)
        .await
        .expect("migration succeeds");

    assert_eq!(outcome.from_version, FIRST_SUPPORTED_VERSION);
    assert_eq!(outcome.to_version, CURRENT_VERSION);
    assert_eq!(
        outcome.steps.len(),
        (CURRENT_VERSION - FIRST_SUPPORTED_VERSION) as usize
    );
    assert_eq!(outcome.database, layout.final_db());

    let db = layout.final_db();
    assert_eq!(count(&db, "User").await, 3);
    assert_eq!(count(&db, "InternalTip").await, 2);
    assert_eq!(count(&db, "Tenant").await, 1);
    assert_eq!(count(&db, "SubmissionStatus").await, 3);
}

#[tokio::test]
async fn reshaped_columns_carry_their_data() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    seed_live(&layout, FIRST_SUPPORTED_VERSION, &Seed::default()).await;

    deployment.migrator().run(FIRST_SUPPORTED_VERSION).await.unwrap();
    let db = layout.final_db();

    let user_columns = column_names(&db, "User").await;
    assert!(user_columns.contains(&"email".to_string()));
    assert!(!user_columns.contains(&"mail_address".to_string()));
    assert!(user_columns.contains(&"two_factor_enable".to_string()));

    let emails = fetch_strings(&db, "SELECT email FROM \"User\" ORDER BY id").await;
    assert_eq!(emails[0].as_deref(), Some("user1@example.org"));

    let languages = fetch_strings(&db, "SELECT language FROM \"User\"").await;
    assert!(languages.iter().all(|l| l.as_deref() == Some("en")));

    let statuses = fetch_strings(&db, "SELECT status FROM \"InternalTip\"").await;
    let new_ids = fetch_strings(
        &db,
        "SELECT id FROM \"SubmissionStatus\" WHERE system_usage = 'new' AND tid = 1",
    )
    .await;
    assert_eq!(new_ids.len(), 1);
    assert!(statuses.iter().all(|s| *s == new_ids[0]));
}

#[tokio::test]
async fn node_settings_move_into_tenant_config() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    seed_live(&layout, FIRST_SUPPORTED_VERSION, &Seed::default()).await;

    deployment.migrator().run(FIRST_SUPPORTED_VERSION).await.unwrap();
    let db = layout.final_db();

    assert_eq!(config_value(&db, 1, "name").await, Some(json!("Acme")));
    assert_eq!(config_value(&db, 1, "enable_signup").await, Some(json!(true)));
    assert_eq!(config_value(&db, 1, "threshold").await, Some(json!(0)));
    // unknown keys are dropped by the normalizer
    assert_eq!(config_value(&db, 1, "smtp_server").await, None);
}

#[tokio::test]
async fn normalizer_records_versions_for_root_tenant() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    seed_live(&layout, 42, &Seed::default()).await;

    deployment.migrator().run(42).await.unwrap();
    let db = layout.final_db();

    assert_eq!(config_value(&db, 1, "version").await, Some(json!(APP_VERSION)));
    assert_eq!(config_value(&db, 1, "latest_version").await, Some(json!(APP_VERSION)));
    assert_eq!(config_value(&db, 1, "version_db").await, Some(json!(CURRENT_VERSION)));
    assert_eq!(count(&db, "ConfigL10N").await, 4);
}

#[tokio::test]
async fn current_database_is_left_alone() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    let live = seed_live(&layout, CURRENT_VERSION, &Seed::default()).await;
    let before = std::fs::read(&live).unwrap();

    let outcome = deployment.migrator().run(CURRENT_VERSION).await.unwrap();

    assert!(outcome.up_to_date());
    assert_eq!(std::fs::read(&live).unwrap(), before);
    assert!(!deployment.staging_dir().exists());
}
