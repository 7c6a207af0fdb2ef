//! Disposable directory holding the `old.db`/`new.db` pair of the running
//! step. Everything below it is securely erased on teardown.

use crate::security::{overwrite_and_remove, wipe_dir};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const OLD_DB: &str = "old.db";
const NEW_DB: &str = "new.db";

#[derive(Debug)]
pub struct StagingWorkspace {
    dir: PathBuf,
    wipe_passes: u32,
    torn_down: bool,
}

impl StagingWorkspace {
    /// Create the workspace at `dir`, erasing leftovers of an interrupted run.
    pub fn create(dir: &Path, wipe_passes: u32) -> Result<Self> {
        if fs::symlink_metadata(dir).is_ok() {
            tracing::warn!(dir = %dir.display(), "removing stale staging workspace");
            wipe_dir(dir, wipe_passes)?;
        }
        fs::create_dir_all(dir)
            .with_context(|| format!("create staging directory {}", dir.display()))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            wipe_passes,
            torn_down: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn old_db(&self) -> PathBuf {
        self.dir.join(OLD_DB)
    }

    pub fn new_db(&self) -> PathBuf {
        self.dir.join(NEW_DB)
    }

    /// Copy the live database verbatim as the first step's source.
    pub fn seed(&self, live: &Path) -> Result<()> {
        fs::copy(live, self.old_db()).with_context(|| {
            format!(
                "copy {} into staging {}",
                live.display(),
                self.old_db().display()
            )
        })?;
        Ok(())
    }

    /// Promote the previous step's `new.db` to `old.db`. A no-op before the
    /// first step, where `old.db` is the seeded copy.
    pub fn rotate(&self) -> Result<()> {
        let new_db = self.new_db();
        if !new_db.exists() {
            return Ok(());
        }
        overwrite_and_remove(&self.old_db(), self.wipe_passes)?;
        fs::rename(&new_db, self.old_db())
            .with_context(|| format!("rotate {} to {}", new_db.display(), OLD_DB))
    }

    /// Drop a half-built `new.db` so the step can create it afresh.
    pub fn discard_new(&self) -> Result<()> {
        overwrite_and_remove(&self.new_db(), self.wipe_passes)
    }

    pub fn teardown(&mut self) -> Result<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        wipe_dir(&self.dir, self.wipe_passes)
    }
}

impl Drop for StagingWorkspace {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            tracing::error!(dir = %self.dir.display(), "staging teardown failed: {err:#}");
        }
    }
}
