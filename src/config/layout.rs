use super::Config;
use std::path::{Path, PathBuf};

/// Filesystem layout of one deployment: where the live database lives for a
/// given schema version, where the migrated file is published, and where the
/// staging workspace is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    working_path: PathBuf,
    file_name: String,
    legacy_dir: String,
    legacy_prefix: String,
    legacy_layout_before: Option<u32>,
    staging_dir: PathBuf,
}

impl StoreLayout {
    pub fn new(working_path: &Path) -> Self {
        Config {
            working_path: working_path.to_path_buf(),
            ..Config::default()
        }
        .layout()
    }

    pub fn working_path(&self) -> &Path {
        &self.working_path
    }

    /// Path of the single current-layout database file.
    pub fn final_db(&self) -> PathBuf {
        self.working_path.join(&self.file_name)
    }

    /// Directory holding legacy per-version files.
    pub fn legacy_dir(&self) -> PathBuf {
        self.working_path.join(&self.legacy_dir)
    }

    pub fn legacy_db(&self, version: u32) -> PathBuf {
        self.legacy_dir()
            .join(format!("{}-{version}.db", self.legacy_prefix))
    }

    /// `true` when databases at `version` used per-version file naming.
    pub fn uses_legacy_layout(&self, version: u32) -> bool {
        self.legacy_layout_before
            .is_some_and(|threshold| version < threshold)
    }

    /// Where the live database of a deployment at `version` is stored.
    pub fn live_db(&self, version: u32) -> PathBuf {
        if self.uses_legacy_layout(version) {
            self.legacy_db(version)
        } else {
            self.final_db()
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Parse a legacy file name back into its schema version.
    pub fn parse_legacy_file_name(&self, file_name: &str) -> Option<u32> {
        file_name
            .strip_prefix(&self.legacy_prefix)?
            .strip_prefix('-')?
            .strip_suffix(".db")?
            .parse()
            .ok()
    }
}

impl Config {
    pub fn layout(&self) -> StoreLayout {
        StoreLayout {
            working_path: self.working_path.clone(),
            file_name: self.database.file_name.clone(),
            legacy_dir: self.database.legacy_dir.clone(),
            legacy_prefix: self.database.legacy_prefix.clone(),
            legacy_layout_before: self.database.legacy_layout_before,
            staging_dir: self.working_path.join(&self.migration.staging_dir),
        }
    }
}
