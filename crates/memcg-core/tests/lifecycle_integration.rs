// Integration tests for LifecycleManager
// A temporary directory stands in for the cgroup mount

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use memcg_core::utils::read_control_uint;
use memcg_core::{
    CgroupError, FsBackend, GroupBackend, GroupDescriptor, GroupPath, LifecycleManager, Pid,
    ResourceSpec, Result, SchemaVersion,
};
use tempfile::TempDir;

fn unified_root() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("cgroup.controllers"), "cpu memory\n").unwrap();
    dir
}

fn legacy_root() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("memory")).unwrap();
    dir
}

/// FsBackend with injectable failures
struct FaultyBackend {
    inner: FsBackend,
    join_error: RefCell<Option<CgroupError>>,
    /// Create a directory with this name inside the group on registration,
    /// so the matching limit write fails
    block_file: Option<&'static str>,
    /// Report unified groups as a version mismatch carrying their path
    unified_as_mismatch: bool,
}

impl FaultyBackend {
    fn new(root: &Path) -> Self {
        Self {
            inner: FsBackend::new(root),
            join_error: RefCell::new(None),
            block_file: None,
            unified_as_mismatch: false,
        }
    }

    fn unified_as_mismatch(mut self) -> Self {
        self.unified_as_mismatch = true;
        self
    }

    fn failing_join(self, err: CgroupError) -> Self {
        *self.join_error.borrow_mut() = Some(err);
        self
    }

    fn blocking(mut self, name: &'static str) -> Self {
        self.block_file = Some(name);
        self
    }
}

impl GroupBackend for FaultyBackend {
    fn resolve_path(&self, group: &str) -> Result<GroupPath> {
        let path = self.inner.resolve_path(group)?;
        if self.unified_as_mismatch && path.version() == SchemaVersion::V2 {
            return Err(CgroupError::VersionMismatch(path.path().to_path_buf()));
        }
        Ok(path)
    }

    fn register_v2_controller(&self, controller: &str, path: &Path) -> Result<()> {
        if let Some(name) = self.block_file {
            fs::create_dir(path.join(name)).unwrap();
        }
        self.inner.register_v2_controller(controller, path)
    }

    fn join(&self, group: &str, pid: Pid) -> Result<()> {
        match self.join_error.borrow_mut().take() {
            Some(err) => Err(err),
            None => self.inner.join(group, pid),
        }
    }

    fn remove_path(&self, path: &Path) -> Result<()> {
        self.inner.remove_path(path)
    }
}

#[test]
fn test_apply_v1_writes_limits_then_joins() {
    let root = legacy_root();
    let manager = LifecycleManager::new(FsBackend::new(root.path()));
    let spec = ResourceSpec::new()
        .with_memory(104857600)
        .with_kernel_memory(8388608)
        .with_memory_swappiness(10);

    manager
        .apply(&GroupDescriptor::new("app", Pid::from_raw(4242), spec))
        .unwrap();

    let group = root.path().join("memory/app");
    assert_eq!(
        fs::read_to_string(group.join("memory.limit_in_bytes")).unwrap(),
        "104857600"
    );
    assert_eq!(
        read_control_uint(&group, "memory.kmem.limit_in_bytes").unwrap(),
        8388608
    );
    assert_eq!(read_control_uint(&group, "memory.swappiness").unwrap(), 10);
    assert_eq!(
        fs::read_to_string(group.join("cgroup.procs")).unwrap(),
        "4242"
    );
}

#[test]
fn test_apply_v2_registers_controller() {
    let root = unified_root();
    let manager = LifecycleManager::new(FsBackend::new(root.path()));
    let spec = ResourceSpec::new()
        .with_memory(104857600)
        .with_kernel_memory(8388608);

    manager
        .apply(&GroupDescriptor::new("pods/app", Pid::from_raw(1), spec))
        .unwrap();

    let group = root.path().join("pods/app");
    assert_eq!(
        fs::read_to_string(group.join("memory.max")).unwrap(),
        "104857600"
    );
    assert!(!group.join("memory.kmem.limit_in_bytes").exists());
    assert_eq!(
        fs::read_to_string(root.path().join("pods/cgroup.subtree_control")).unwrap(),
        "+memory"
    );
}

#[test]
fn test_apply_version_mismatch_resolution_uses_unified_files() {
    let root = unified_root();
    let backend = FaultyBackend::new(root.path()).unified_as_mismatch();
    let manager = LifecycleManager::new(backend);
    let spec = ResourceSpec::new()
        .with_memory(104857600)
        .with_kernel_memory(8388608)
        .with_memory_swappiness(10);

    manager
        .apply(&GroupDescriptor::new("app", Pid::from_raw(99), spec))
        .unwrap();

    let group = root.path().join("app");
    assert_eq!(
        fs::read_to_string(group.join("memory.max")).unwrap(),
        "104857600"
    );
    assert_eq!(
        fs::read_to_string(root.path().join("cgroup.subtree_control")).unwrap(),
        "+memory"
    );
    assert!(!group.join("memory.limit_in_bytes").exists());
    assert!(!group.join("memory.kmem.limit_in_bytes").exists());
    assert!(!group.join("memory.swappiness").exists());
    assert_eq!(fs::read_to_string(group.join("cgroup.procs")).unwrap(), "99");
}

#[test]
fn test_apply_v2_swap_below_memory() {
    let root = unified_root();
    let manager = LifecycleManager::new(FsBackend::new(root.path()));
    let spec = ResourceSpec::new()
        .with_memory(2 << 30)
        .with_memory_swap(512 << 20);

    manager
        .apply(&GroupDescriptor::new("app", Pid::from_raw(1), spec))
        .unwrap();

    let group = root.path().join("app");
    assert_eq!(read_control_uint(&group, "memory.max").unwrap(), 2 << 30);
    assert_eq!(read_control_uint(&group, "memory.swap.max").unwrap(), 512 << 20);
}

#[test]
fn test_failed_nested_apply_leaves_no_parents() {
    let root = legacy_root();
    let manager = LifecycleManager::new(FsBackend::new(root.path()));

    let err = manager
        .apply(&GroupDescriptor::new(
            "pods/burst/app",
            Pid::from_raw(1),
            ResourceSpec::new().with_memory_swappiness(101),
        ))
        .unwrap_err();

    assert!(matches!(err, CgroupError::ValidationError(_)));
    assert!(root.path().join("memory").exists());
    assert!(!root.path().join("memory/pods").exists());
}

#[test]
fn test_io_failure_rolls_back_created_directory() {
    let root = unified_root();
    let backend = FaultyBackend::new(root.path()).blocking("memory.max");
    let manager = LifecycleManager::new(backend);

    let err = manager
        .apply(&GroupDescriptor::new(
            "app",
            Pid::from_raw(1),
            ResourceSpec::new().with_memory(4096),
        ))
        .unwrap_err();

    assert!(!err.is_not_found());
    assert!(!err.is_version_mismatch());
    assert!(!root.path().join("app").exists());
}

#[test]
fn test_join_failure_rolls_back() {
    let root = legacy_root();
    let backend = FaultyBackend::new(root.path()).failing_join(CgroupError::PermissionDenied(
        "cgroup.procs".to_string(),
    ));
    let manager = LifecycleManager::new(backend);

    let result = manager.apply(&GroupDescriptor::new(
        "app",
        Pid::from_raw(1),
        ResourceSpec::new().with_memory(4096),
    ));

    assert!(matches!(result, Err(CgroupError::PermissionDenied(_))));
    assert!(!root.path().join("memory/app").exists());
}

#[test]
fn test_join_version_mismatch_keeps_directory() {
    let root = legacy_root();
    let path = root.path().join("memory/app");
    let backend =
        FaultyBackend::new(root.path()).failing_join(CgroupError::VersionMismatch(path.clone()));
    let manager = LifecycleManager::new(backend);

    manager
        .apply(&GroupDescriptor::new(
            "app",
            Pid::from_raw(1),
            ResourceSpec::new().with_memory(4096),
        ))
        .unwrap();

    assert!(path.join("memory.limit_in_bytes").exists());
}

#[test]
fn test_join_not_found_tolerated() {
    let root = legacy_root();
    let backend = FaultyBackend::new(root.path())
        .failing_join(CgroupError::NotFound("memory".to_string()));
    let manager = LifecycleManager::new(backend);

    manager
        .apply(&GroupDescriptor::new(
            "app",
            Pid::from_raw(1),
            ResourceSpec::new().with_memory(4096),
        ))
        .unwrap();
}

#[test]
fn test_remove_missing_group_succeeds() {
    let root = legacy_root();
    let manager = LifecycleManager::new(FsBackend::new(root.path()));

    manager.remove_group("never-created").unwrap();
}

#[test]
fn test_remove_without_controller_succeeds() {
    let root = TempDir::new().unwrap();
    let manager = LifecycleManager::new(FsBackend::new(root.path()));

    manager.remove_group("app").unwrap();
}

#[test]
fn test_apply_then_remove_v1() {
    let root = legacy_root();
    let manager = LifecycleManager::new(FsBackend::new(root.path()));
    let desc = GroupDescriptor::new(
        "app",
        Pid::from_raw(1),
        ResourceSpec::new().with_memory(4096),
    );

    manager.apply(&desc).unwrap();
    assert!(root.path().join("memory/app").exists());

    manager.remove(&desc).unwrap();
    assert!(!root.path().join("memory/app").exists());
}

#[test]
fn test_remove_leaves_unified_group() {
    let root = unified_root();
    let manager = LifecycleManager::new(FsBackend::new(root.path()));
    fs::create_dir(root.path().join("app")).unwrap();

    manager.remove_group("app").unwrap();

    assert!(root.path().join("app").exists());
}

#[test]
fn test_update_rewrites_limits() {
    let root = legacy_root();
    let manager = LifecycleManager::new(FsBackend::new(root.path()));
    let mut desc = GroupDescriptor::new(
        "app",
        Pid::from_raw(1),
        ResourceSpec::new().with_memory(4096),
    );
    manager.apply(&desc).unwrap();

    desc.resources = ResourceSpec::new().with_memory(8192);
    manager.update(&desc).unwrap();

    let group = root.path().join("memory/app");
    assert_eq!(read_control_uint(&group, "memory.limit_in_bytes").unwrap(), 8192);
}

#[test]
fn test_stats_through_manager() {
    let root = unified_root();
    let manager = LifecycleManager::new(FsBackend::new(root.path()));
    let group = root.path().join("app");
    fs::create_dir(&group).unwrap();
    fs::write(group.join("memory.stat"), "anon 2048\nfile 1024\n").unwrap();
    fs::write(group.join("memory.current"), "3072\n").unwrap();

    let report = manager.stats("app").unwrap();

    assert_eq!(report.cache, 1024);
    assert_eq!(report.usage.usage, 3072);
    assert_eq!(report.stats.len(), 2);
}

#[test]
fn test_stats_without_controller_is_zero() {
    let root = TempDir::new().unwrap();
    let manager = LifecycleManager::new(FsBackend::new(root.path()));

    let report = manager.stats("app").unwrap();

    assert_eq!(report.usage.usage, 0);
    assert!(report.stats.is_empty());
}

#[test]
fn test_set_then_read_back_all_fields() {
    let root = legacy_root();
    let manager = LifecycleManager::new(FsBackend::new(root.path()));
    let spec = ResourceSpec::new()
        .with_memory(536870912)
        .with_memory_reservation(268435456)
        .with_memory_swap(1073741824)
        .with_kernel_memory(67108864)
        .with_memory_swappiness(60);

    manager
        .apply(&GroupDescriptor::new("app", Pid::from_raw(1), spec.clone()))
        .unwrap();

    let group = GroupPath::new(root.path().join("memory/app"), SchemaVersion::V1);
    let schema = group.schema();
    let read = |name: &str| read_control_uint(group.path(), name).unwrap() as i64;

    assert_eq!(read(schema.limit_file()), spec.memory);
    assert_eq!(read(schema.reservation_file()), spec.memory_reservation);
    assert_eq!(read(schema.swap_limit_file()), spec.memory_swap);
    assert_eq!(read(schema.kernel_limit_file().unwrap()), spec.kernel_memory);
    assert_eq!(read(schema.swappiness_file().unwrap()), spec.memory_swappiness);
}
