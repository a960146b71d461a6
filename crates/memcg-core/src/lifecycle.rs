//! Group lifecycle: create, limit, join, roll back, remove

use std::fs;
use std::path::{Path, PathBuf};

use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::error::{CgroupError, Result};
use crate::limits::LimitWriter;
use crate::stats::StatsCollector;
use crate::types::{GroupPath, MemoryReport, ResourceSpec, SchemaVersion};

/// Controller name registered on the unified hierarchy
pub const MEMORY_CONTROLLER: &str = "memory";

/// Host-side collaborators the lifecycle depends on
///
/// Errors are classified through [`CgroupError::kind`]: `NotFound` is benign,
/// `VersionMismatch` switches to v2 handling, anything else aborts.
pub trait GroupBackend {
    /// Resolve the memory controller directory of a logical group
    fn resolve_path(&self, group: &str) -> Result<GroupPath>;

    /// Enable `controller` for the subtree containing `path` (v2 only)
    fn register_v2_controller(&self, controller: &str, path: &Path) -> Result<()>;

    /// Move `pid` into the group
    fn join(&self, group: &str, pid: Pid) -> Result<()>;

    /// Recursively remove a group directory; a missing directory is success
    fn remove_path(&self, path: &Path) -> Result<()>;
}

/// What to apply, to which group, for which process
#[derive(Debug, Clone)]
pub struct GroupDescriptor {
    /// Logical group identifier, relative to the controller root
    pub group: String,

    /// Process bound to the group after limits are written
    pub pid: Pid,

    pub resources: ResourceSpec,
}

impl GroupDescriptor {
    pub fn new(group: impl Into<String>, pid: Pid, resources: ResourceSpec) -> Self {
        Self {
            group: group.into(),
            pid,
            resources,
        }
    }
}

/// Outermost directory created during an `apply`, removed again unless committed
#[derive(Debug, Default)]
struct Rollback {
    created: Option<PathBuf>,
    committed: bool,
}

impl Rollback {
    fn record(&mut self, path: &Path) {
        self.created = Some(path.to_path_buf());
    }

    fn commit(&mut self) {
        self.committed = true;
    }

    fn finish<B: GroupBackend>(self, backend: &B) {
        if self.committed {
            return;
        }
        if let Some(path) = self.created {
            info!("Rolling back cgroup directory {:?}", path);
            if let Err(e) = backend.remove_path(&path) {
                warn!("Failed to roll back {:?}: {}", path, e);
            }
        }
    }
}

/// Outermost directory `create_dir_all(path)` would create
fn first_missing_ancestor(path: &Path) -> &Path {
    let mut top = path;
    while let Some(parent) = top.parent() {
        if parent.as_os_str().is_empty() || parent.exists() {
            break;
        }
        top = parent;
    }
    top
}

/// Memory controller lifecycle manager
pub struct LifecycleManager<B: GroupBackend> {
    backend: B,
}

impl<B: GroupBackend> LifecycleManager<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve a group, folding the benign outcomes
    ///
    /// `VersionMismatch` carries the unified path and turns into a v2 group;
    /// `NotFound` means the memory controller is not available.
    pub fn resolve(&self, group: &str) -> Result<Option<GroupPath>> {
        match self.backend.resolve_path(group) {
            Ok(path) => Ok(Some(path)),
            Err(CgroupError::VersionMismatch(path)) => {
                Ok(Some(GroupPath::new(path, SchemaVersion::V2)))
            }
            Err(e) if e.is_not_found() => {
                debug!("Memory controller not available for {}: {}", group, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Create the group, write its limits, then move the process in
    ///
    /// Limits go in before the join because the kernel rejects kmem limit
    /// changes on populated groups. A fatal error removes the directories this
    /// call created, parents included; control files written before the error
    /// are left alone.
    pub fn apply(&self, desc: &GroupDescriptor) -> Result<()> {
        let resolved = self.resolve(&desc.group)?;

        let mut rollback = Rollback::default();
        let result = self.apply_resolved(desc, resolved.as_ref(), &mut rollback);

        match &result {
            Ok(()) => rollback.commit(),
            Err(e) if e.is_version_mismatch() => rollback.commit(),
            Err(_) => {}
        }
        rollback.finish(&self.backend);

        if result.is_ok() {
            info!("Applied memory limits to {} (pid {})", desc.group, desc.pid);
        }
        result
    }

    fn apply_resolved(
        &self,
        desc: &GroupDescriptor,
        group: Option<&GroupPath>,
        rollback: &mut Rollback,
    ) -> Result<()> {
        if desc.resources.is_memory_assigned() {
            match group {
                Some(group) => {
                    let path = group.path();
                    if !group.exists() {
                        let top = first_missing_ancestor(path);
                        fs::create_dir_all(path)
                            .map_err(|e| CgroupError::control_file(path, e))?;
                        rollback.record(top);
                        debug!("Created cgroup directory {:?}", path);
                    }

                    if group.version() == SchemaVersion::V2 {
                        self.backend
                            .register_v2_controller(MEMORY_CONTROLLER, path)?;
                    }

                    LimitWriter::set(group, &desc.resources)?;
                }
                None => warn!(
                    "Memory limits requested for {} but no memory controller is available",
                    desc.group
                ),
            }
        }

        match self.backend.join(&desc.group, desc.pid) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() || e.is_version_mismatch() => {
                debug!("Join of {} into {} skipped: {}", desc.pid, desc.group, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Rewrite the limits of an existing group without touching membership
    pub fn update(&self, desc: &GroupDescriptor) -> Result<()> {
        let group = self
            .resolve(&desc.group)?
            .ok_or_else(|| CgroupError::NotFound(desc.group.clone()))?;

        if !group.exists() {
            return Err(CgroupError::NotFound(group.path().display().to_string()));
        }

        LimitWriter::set(&group, &desc.resources)?;
        info!("Updated memory limits of {}", desc.group);
        Ok(())
    }

    /// Remove the group directory
    ///
    /// Unified groups are shared with the other controllers, so there is
    /// nothing for the memory controller to remove there.
    pub fn remove(&self, desc: &GroupDescriptor) -> Result<()> {
        self.remove_group(&desc.group)
    }

    pub fn remove_group(&self, group: &str) -> Result<()> {
        match self.resolve(group)? {
            None => Ok(()),
            Some(path) if path.version() == SchemaVersion::V2 => {
                debug!("Skipping removal of unified group {:?}", path.path());
                Ok(())
            }
            Some(path) => {
                self.backend.remove_path(path.path())?;
                info!("Removed cgroup {}", group);
                Ok(())
            }
        }
    }

    /// Collect statistics; an unavailable controller reports zeros
    pub fn stats(&self, group: &str) -> Result<MemoryReport> {
        match self.resolve(group)? {
            Some(path) => StatsCollector::get_stats(&path),
            None => Ok(MemoryReport::default()),
        }
    }
}
