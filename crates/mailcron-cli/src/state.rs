//! JSON state file carried between cron runs.
//!
//! A run holds [`StateLock`] from load to save, so overlapping cron ticks
//! never work on the same state. Saves go through a temp file and a rename.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mailcron_core::impls::{DirectorySnapshot, InMemoryDirectory, InMemoryTaskStore, TaskStoreSnapshot};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateFile {
    pub tasks: TaskStoreSnapshot,
    pub directory: DirectorySnapshot,
}

impl StateFile {
    pub async fn capture(tasks: &InMemoryTaskStore, directory: &InMemoryDirectory) -> Self {
        Self {
            tasks: tasks.snapshot().await,
            directory: directory.snapshot().await,
        }
    }
}

/// Exclusive hold on a state file for the length of one run.
///
/// The lock is taken on a sibling `.lock` file since saving replaces the
/// state file itself. It is released on drop, or by the OS if the process
/// dies.
pub struct StateLock {
    file: File,
    state_path: PathBuf,
}

impl StateLock {
    /// Take the lock without waiting. Fails if another run holds it.
    pub fn acquire(state_path: &Path) -> anyhow::Result<Self> {
        let lock_path = sibling(state_path, "", ".lock");
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("failed to open lock file {}", lock_path.display()))?;
        file.try_lock_exclusive().with_context(|| {
            format!("another mailcron run holds {}", lock_path.display())
        })?;
        debug!(path = %lock_path.display(), "state lock acquired");
        Ok(Self {
            file,
            state_path: state_path.to_path_buf(),
        })
    }

    /// Load the state file. A missing file is an empty install.
    pub fn load(&self) -> anyhow::Result<StateFile> {
        let path = &self.state_path;
        if !path.exists() {
            info!(path = %path.display(), "state file not found, starting empty");
            return Ok(StateFile::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read state file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse state file {}", path.display()))
    }

    /// Replace the state file. A crash leaves either the old or the new file.
    pub fn save(&self, state: &StateFile) -> anyhow::Result<()> {
        let path = &self.state_path;
        let tmp_path = sibling(path, ".", ".tmp");
        let raw = serde_json::to_string_pretty(state).context("failed to encode state")?;
        std::fs::write(&tmp_path, raw)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to replace state file {}", path.display()))?;
        info!(path = %path.display(), tasks = state.tasks.tasks.len(), "state saved");
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// `dir/state.json` -> `dir/{prefix}state.json{suffix}`.
fn sibling(path: &Path, prefix: &str, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mailcron-state".to_string());
    path.with_file_name(format!("{prefix}{name}{suffix}"))
}
