use anyhow::{Context, Result};
use rand::RngCore;
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use zeroize::Zeroize;

const CHUNK_LEN: usize = 64 * 1024;

/// Overwrite `path` with random bytes `passes` times, flush to disk, then
/// unlink it. A missing file is not an error.
pub fn overwrite_and_remove(path: &Path, passes: u32) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(err).with_context(|| format!("stat {}", path.display()));
        }
    };

    if metadata.is_file() {
        overwrite(path, metadata.len(), passes.max(1))?;
    }

    fs::remove_file(path).with_context(|| format!("remove {}", path.display()))
}

fn overwrite(path: &Path, len: u64, passes: u32) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("open {} for overwrite", path.display()))?;
    let mut buf = vec![0u8; CHUNK_LEN];
    let mut rng = rand::rng();

    let result = (|| -> Result<()> {
        for _ in 0..passes {
            file.seek(SeekFrom::Start(0))?;
            let mut remaining = len;
            while remaining > 0 {
                let n = usize::try_from(remaining).map_or(CHUNK_LEN, |r| r.min(CHUNK_LEN));
                rng.fill_bytes(&mut buf[..n]);
                file.write_all(&buf[..n])?;
                remaining -= n as u64;
            }
            file.sync_all()?;
        }
        Ok(())
    })();

    buf.zeroize();
    result.with_context(|| format!("overwrite {}", path.display()))
}

/// Securely remove every regular file below `dir`, then the directory itself.
///
/// Symlinks are unlinked without being followed, so nothing outside `dir` is
/// touched. A symlink passed as `dir` is removed the same way.
pub fn wipe_dir(dir: &Path, passes: u32) -> Result<()> {
    let metadata = match fs::symlink_metadata(dir) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(err).with_context(|| format!("stat {}", dir.display()));
        }
    };
    if !metadata.is_dir() {
        return overwrite_and_remove(dir, passes);
    }

    for entry in fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("stat {}", path.display()))?;
        if file_type.is_dir() {
            wipe_dir(&path, passes)?;
        } else {
            overwrite_and_remove(&path, passes)?;
        }
    }
    fs::remove_dir(dir).with_context(|| format!("remove directory {}", dir.display()))
}
