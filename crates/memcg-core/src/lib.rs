//! memcg Core Library
//!
//! Version-agnostic adapter for the cgroup memory controller.
//! Translates a [`ResourceSpec`] into control file writes for either the
//! legacy (v1) or unified (v2) hierarchy, manages the group directory
//! lifecycle, and reads usage counters back into a [`MemoryReport`].

pub mod backend;
pub mod error;
pub mod lifecycle;
pub mod limits;
pub mod schema;
pub mod stats;
pub mod types;
pub mod utils;

pub use backend::{FsBackend, DEFAULT_MOUNT_ROOT};
pub use error::{CgroupError, ErrorKind, Result};
pub use lifecycle::{GroupBackend, GroupDescriptor, LifecycleManager, MEMORY_CONTROLLER};
pub use limits::LimitWriter;
pub use schema::{LegacySchema, SchemaVariant, UnifiedSchema};
pub use stats::StatsCollector;
pub use types::{GroupPath, MemoryData, MemoryReport, ResourceSpec, SchemaVersion, SWAPPINESS_UNSET};

pub use nix::unistd::Pid;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
