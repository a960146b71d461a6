//! Host filesystem implementation of [`GroupBackend`]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nix::unistd::Pid;
use tracing::debug;

use crate::error::{CgroupError, Result};
use crate::lifecycle::GroupBackend;
use crate::types::{GroupPath, SchemaVersion};
use crate::utils::write_control_file;

/// Default cgroup mount point
pub const DEFAULT_MOUNT_ROOT: &str = "/sys/fs/cgroup";

const CGROUP_PROCS: &str = "cgroup.procs";
const CGROUP_CONTROLLERS: &str = "cgroup.controllers";
const CGROUP_SUBTREE_CONTROL: &str = "cgroup.subtree_control";

/// Backend operating on a mounted cgroup filesystem
#[derive(Debug, Clone)]
pub struct FsBackend {
    mount_root: PathBuf,
}

impl Default for FsBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNT_ROOT)
    }
}

impl FsBackend {
    pub fn new(mount_root: impl Into<PathBuf>) -> Self {
        Self {
            mount_root: mount_root.into(),
        }
    }

    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }

    /// Detect which hierarchy is mounted at the root
    ///
    /// `cgroup.controllers` only exists at the top of a unified mount; the
    /// legacy layout has one directory per controller instead.
    pub fn detect_version(&self) -> Result<SchemaVersion> {
        if self.mount_root.join(CGROUP_CONTROLLERS).is_file() {
            return Ok(SchemaVersion::V2);
        }
        if self.mount_root.join("memory").is_dir() {
            return Ok(SchemaVersion::V1);
        }
        Err(CgroupError::NotFound(format!(
            "memory controller under {:?}",
            self.mount_root
        )))
    }

    fn group_dir(&self, version: SchemaVersion, group: &str) -> PathBuf {
        let group = group.trim_start_matches('/');
        match version {
            SchemaVersion::V1 => self.mount_root.join("memory").join(group),
            SchemaVersion::V2 => self.mount_root.join(group),
        }
    }
}

impl GroupBackend for FsBackend {
    fn resolve_path(&self, group: &str) -> Result<GroupPath> {
        let version = self.detect_version()?;
        Ok(GroupPath::new(self.group_dir(version, group), version))
    }

    fn register_v2_controller(&self, controller: &str, path: &Path) -> Result<()> {
        let relative = path.strip_prefix(&self.mount_root).map_err(|_| {
            CgroupError::ValidationError(format!(
                "Path {:?} is not under root {:?}",
                path, self.mount_root
            ))
        })?;

        // Every ancestor down to the parent must delegate the controller
        let mut current = self.mount_root.clone();
        let value = format!("+{}", controller);
        write_control_file(&current, CGROUP_SUBTREE_CONTROL, &value)?;

        let components: Vec<_> = relative.components().collect();
        if let Some((_, parents)) = components.split_last() {
            for component in parents {
                current.push(component);
                write_control_file(&current, CGROUP_SUBTREE_CONTROL, &value)?;
            }
        }

        debug!("Enabled {} controller for {:?}", controller, path);
        Ok(())
    }

    fn join(&self, group: &str, pid: Pid) -> Result<()> {
        let group = self.resolve_path(group)?;
        let path = group.path();

        fs::create_dir_all(path).map_err(|e| CgroupError::control_file(path, e))?;
        write_control_file(path, CGROUP_PROCS, &pid.to_string())?;

        debug!("Added process {} to {:?}", pid, path);
        Ok(())
    }

    fn remove_path(&self, path: &Path) -> Result<()> {
        match remove_group_dir(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CgroupError::control_file(path, e)),
        }
    }
}

/// Remove a group directory tree
///
/// On cgroupfs only `rmdir` works and the control files vanish with the
/// directory. Anywhere else the files are real and need deleting first.
fn remove_group_dir(path: &Path) -> io::Result<()> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            remove_group_dir(&entry.path())?;
        }
    }

    match fs::remove_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(_) => fs::remove_dir_all(path),
    }
}
