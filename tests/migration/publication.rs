use super::store_harness::{Deployment, Seed, count, seed_live};
use strata::MigrationError;
use strata::catalog::FIRST_SUPPORTED_VERSION;

#[tokio::test]
async fn legacy_layout_is_consolidated_into_the_final_file() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    let legacy = seed_live(&layout, FIRST_SUPPORTED_VERSION, &Seed::default()).await;
    assert_eq!(legacy, layout.legacy_db(FIRST_SUPPORTED_VERSION));
    // an older leftover next to the live file goes with the directory
    std::fs::write(layout.legacy_db(FIRST_SUPPORTED_VERSION - 1), b"stale").unwrap();

    deployment.migrator().run(FIRST_SUPPORTED_VERSION).await.unwrap();

    assert!(layout.final_db().exists());
    assert!(!legacy.exists());
    assert!(!layout.legacy_dir().exists());
    assert_eq!(count(&layout.final_db(), "User").await, 3);
}

#[tokio::test]
async fn single_file_layout_is_replaced_in_place() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    let live = seed_live(&layout, 43, &Seed::default()).await;
    assert_eq!(live, layout.final_db());

    deployment.migrator().run(43).await.unwrap();

    assert_eq!(count(&live, "SubmissionStatus").await, 3);
    let leftovers: Vec<_> = std::fs::read_dir(layout.working_path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name != "strata.db")
        .collect();
    assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
}

#[tokio::test]
async fn stale_staging_directory_is_purged() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    seed_live(&layout, 44, &Seed::default()).await;
    std::fs::create_dir_all(deployment.staging_dir()).unwrap();
    std::fs::write(deployment.staging_dir().join("new.db"), b"crashed run").unwrap();

    deployment.migrator().run(44).await.unwrap();

    assert!(!deployment.staging_dir().exists());
}

#[tokio::test]
async fn failed_publication_erases_its_copy_and_keeps_the_legacy_file() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    let legacy = seed_live(&layout, FIRST_SUPPORTED_VERSION, &Seed::default()).await;
    let before = std::fs::read(&legacy).unwrap();
    // a non-empty directory where the final file goes makes the rename fail
    std::fs::create_dir_all(layout.final_db().join("occupied")).unwrap();

    let err = deployment
        .migrator()
        .run(FIRST_SUPPORTED_VERSION)
        .await
        .unwrap_err();

    assert!(matches!(err, MigrationError::Publish(_)), "{err}");
    assert!(!layout.final_db().with_extension("db.publish").exists());
    assert_eq!(std::fs::read(&legacy).unwrap(), before);
    assert!(layout.final_db().join("occupied").is_dir());
    assert!(!deployment.staging_dir().exists());
}

#[cfg(unix)]
#[tokio::test]
async fn legacy_cleanup_does_not_follow_symlinks() {
    let deployment = Deployment::new();
    let layout = deployment.layout();
    seed_live(&layout, FIRST_SUPPORTED_VERSION, &Seed::default()).await;
    let outside = deployment.tmp.path().join("backups");
    std::fs::create_dir_all(&outside).unwrap();
    std::fs::write(outside.join("strata-37.db"), b"backup").unwrap();
    std::os::unix::fs::symlink(&outside, layout.legacy_dir().join("backups")).unwrap();

    deployment.migrator().run(FIRST_SUPPORTED_VERSION).await.unwrap();

    assert!(!layout.legacy_dir().exists());
    assert_eq!(std::fs::read(outside.join("strata-37.db")).unwrap(), b"backup");
    assert_eq!(count(&layout.final_db(), "User").await, 3);
}
