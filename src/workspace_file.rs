use anyhow::{Context, Result};
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::approval::Workspace;

/// JSON workspace snapshot guarded by a sibling `.lock` file.
///
/// Hold the guard from [`WorkspaceFile::lock`] across load and save so that
/// concurrent invocations serialize their read-modify-write.
pub struct WorkspaceFile {
    path: PathBuf,
    lock: RwLock<File>,
}

impl WorkspaceFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let lock_path = lock_path_for(&path);
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

        Ok(Self {
            path,
            lock: RwLock::new(lock_file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until no other process holds the workspace
    pub fn lock(&mut self) -> Result<RwLockWriteGuard<'_, File>> {
        let guard = self
            .lock
            .write()
            .context("Failed to lock the workspace")?;
        debug!(path = %self.path.display(), "Workspace locked");
        Ok(guard)
    }
}

/// Read the snapshot, or an empty workspace when the file does not exist yet
pub fn load_workspace(path: &Path) -> Result<Workspace> {
    if !path.exists() {
        return Ok(Workspace::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read workspace {}", path.display()))?;
    let workspace = serde_json::from_str(&content)
        .with_context(|| format!("Workspace {} is not valid", path.display()))?;
    Ok(workspace)
}

/// Write the snapshot through a temporary file and rename it into place
pub fn save_workspace(path: &Path, workspace: &Workspace) -> Result<()> {
    let json = serde_json::to_string_pretty(workspace)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    debug!(path = %path.display(), "Workspace saved");
    Ok(())
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "workspace".into());
    name.push(".lock");
    path.with_file_name(name)
}
