use super::store_harness::{Deployment, Seed, seed_live};
use strata::MigrationError;
use strata::catalog::{CURRENT_VERSION, FIRST_SUPPORTED_VERSION};

#[tokio::test]
async fn unsupported_enabled_language_is_refused_before_staging() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    let seed = Seed {
        languages: vec!["en", "xx"],
        ..Seed::default()
    };
    let live = seed_live(&layout, 42, &seed).await;
    let before = std::fs::read(&live).unwrap();

    let err = deployment.migrator().run(42).await.unwrap_err();

    assert!(err.is_preflight());
    match err {
        MigrationError::LanguageCompatibility { languages } => {
            assert_eq!(languages, vec!["xx".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!deployment.staging_dir().exists());
    assert!(!layout.working_path().join("tmp").exists());
    assert_eq!(std::fs::read(&live).unwrap(), before);
}

#[tokio::test]
async fn too_old_version_is_refused_without_touching_files() {
    let deployment = Deployment::new();
    let err = deployment
        .migrator()
        .run(FIRST_SUPPORTED_VERSION - 1)
        .await
        .unwrap_err();

    assert!(err.is_preflight());
    assert!(matches!(
        err,
        MigrationError::UnsupportedStartingVersion { version, first }
            if version == FIRST_SUPPORTED_VERSION - 1 && first == FIRST_SUPPORTED_VERSION
    ));
    assert!(!deployment.staging_dir().exists());
}

#[tokio::test]
async fn newer_version_is_refused() {
    let deployment = Deployment::new();
    let err = deployment
        .migrator()
        .run(CURRENT_VERSION + 1)
        .await
        .unwrap_err();

    assert!(err.is_preflight());
    assert!(matches!(err, MigrationError::NewerThanSupported { .. }));
}

#[tokio::test]
async fn missing_live_database_is_refused() {
    let deployment = Deployment::new();
    let err = deployment.migrator().run(42).await.unwrap_err();

    assert!(err.is_preflight());
    assert!(matches!(err, MigrationError::LiveDatabaseMissing(_)));
    assert!(!deployment.staging_dir().exists());
}
