//! Per-container cpu and memory control groups.
//!
//! Uses the cgroup v1 split hierarchies: each container gets
//! `<root>/cpu/whale/<id>/` and `<root>/memory/whale/<id>/`, the
//! calling process is written into the `tasks` file, and limits are
//! written only when the caller requested a nonzero value. Nothing
//! removes the directories afterward; cleanup is an operator concern.

use std::fs;
use std::path::{Path, PathBuf};

use whale_common::constants::CGROUP_SUBTREE;
use whale_common::error::{Result, WhaleError};

/// Writer for one container's cgroup subtrees.
#[derive(Debug)]
pub struct CgroupConfigurator {
    root: PathBuf,
    container_id: String,
}

impl CgroupConfigurator {
    /// Creates a configurator against the system hierarchy root.
    #[must_use]
    pub fn new(container_id: &str) -> Self {
        Self::with_root(Path::new(whale_common::constants::CGROUP_ROOT), container_id)
    }

    /// Creates a configurator against an explicit hierarchy root.
    ///
    /// Tests inject a scratch directory here.
    #[must_use]
    pub fn with_root(root: &Path, container_id: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            container_id: container_id.to_string(),
        }
    }

    /// Returns this container's directory under the named controller.
    #[must_use]
    pub fn controller_dir(&self, controller: &str) -> PathBuf {
        self.root
            .join(controller)
            .join(CGROUP_SUBTREE)
            .join(&self.container_id)
    }

    /// Places the current process into a new cpu cgroup and applies
    /// the share weight when `shares` is nonzero.
    ///
    /// # Errors
    ///
    /// Returns an error if the cgroup directory cannot be created or a
    /// control file cannot be written.
    pub fn setup_cpu(&self, shares: u64) -> Result<()> {
        let limit = (shares > 0).then(|| ("cpu.shares", shares));
        self.setup_controller("cpu", limit)
    }

    /// Places the current process into a new memory cgroup and applies
    /// the byte limit when `bytes` is nonzero.
    ///
    /// # Errors
    ///
    /// Returns an error if the cgroup directory cannot be created or a
    /// control file cannot be written.
    pub fn setup_memory(&self, bytes: u64) -> Result<()> {
        let limit = (bytes > 0).then(|| ("memory.limit_in_bytes", bytes));
        self.setup_controller("memory", limit)
    }

    fn setup_controller(&self, controller: &str, limit: Option<(&str, u64)>) -> Result<()> {
        let dir = self.controller_dir(controller);
        fs::create_dir_all(&dir).map_err(|e| WhaleError::io(dir.clone(), e))?;

        let tasks = dir.join("tasks");
        fs::write(&tasks, std::process::id().to_string())
            .map_err(|e| WhaleError::io(tasks, e))?;
        tracing::info!(controller, dir = %dir.display(), "joined cgroup");

        if let Some((file, value)) = limit {
            let path = dir.join(file);
            fs::write(&path, value.to_string()).map_err(|e| WhaleError::io(path, e))?;
            tracing::info!(controller, file, value, "applied cgroup limit");
        }
        Ok(())
    }
}
