//! Data types for memory controller management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::schema::{LegacySchema, SchemaVariant, UnifiedSchema};

/// Swappiness sentinel meaning "leave the kernel default alone"
pub const SWAPPINESS_UNSET: i64 = -1;

/// Memory limits to apply to a group
///
/// Zero (or negative, for swap and kernel memory) means the field is unset and
/// nothing is written for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSpec {
    /// Hard memory limit (bytes)
    pub memory: i64,

    /// Soft memory limit (bytes)
    pub memory_reservation: i64,

    /// Memory plus swap limit (bytes)
    pub memory_swap: i64,

    /// Kernel memory limit (bytes, v1 only)
    pub kernel_memory: i64,

    /// Disable the OOM killer for the group (v1 only)
    pub oom_kill_disable: bool,

    /// Swappiness tunable, 0-100 or -1 for unset (v1 only)
    pub memory_swappiness: i64,
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self {
            memory: 0,
            memory_reservation: 0,
            memory_swap: 0,
            kernel_memory: 0,
            oom_kill_disable: false,
            memory_swappiness: SWAPPINESS_UNSET,
        }
    }
}

impl ResourceSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory(mut self, bytes: i64) -> Self {
        self.memory = bytes;
        self
    }

    pub fn with_memory_reservation(mut self, bytes: i64) -> Self {
        self.memory_reservation = bytes;
        self
    }

    pub fn with_memory_swap(mut self, bytes: i64) -> Self {
        self.memory_swap = bytes;
        self
    }

    pub fn with_kernel_memory(mut self, bytes: i64) -> Self {
        self.kernel_memory = bytes;
        self
    }

    pub fn with_oom_kill_disable(mut self, disable: bool) -> Self {
        self.oom_kill_disable = disable;
        self
    }

    pub fn with_memory_swappiness(mut self, swappiness: i64) -> Self {
        self.memory_swappiness = swappiness;
        self
    }

    /// True when at least one field would produce a write
    pub fn is_memory_assigned(&self) -> bool {
        self.memory != 0
            || self.memory_reservation != 0
            || self.memory_swap > 0
            || self.kernel_memory > 0
            || self.oom_kill_disable
            || self.memory_swappiness != SWAPPINESS_UNSET
    }
}

/// On-disk schema generation of a group directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Legacy per-controller hierarchy
    V1,
    /// Unified hierarchy
    V2,
}

impl SchemaVersion {
    pub fn schema(self) -> &'static dyn SchemaVariant {
        match self {
            SchemaVersion::V1 => &LegacySchema,
            SchemaVersion::V2 => &UnifiedSchema,
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaVersion::V1 => write!(f, "v1"),
            SchemaVersion::V2 => write!(f, "v2"),
        }
    }
}

/// Memory controller directory of a group, bound to the schema it uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPath {
    path: PathBuf,
    version: SchemaVersion,
}

impl GroupPath {
    pub fn new(path: impl Into<PathBuf>, version: SchemaVersion) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn schema(&self) -> &'static dyn SchemaVariant {
        self.version.schema()
    }

    /// Check if the group directory exists
    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }
}

/// Counters of one namespace (`memory`, `memory.memsw`, `memory.kmem`, ...)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryData {
    /// Current usage (bytes)
    pub usage: u64,

    /// Peak usage (bytes, v1 only)
    pub max_usage: u64,

    /// Number of times the limit was hit (v1 only)
    pub failcnt: u64,
}

/// Normalized memory usage report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryReport {
    /// Base memory counters
    pub usage: MemoryData,

    /// Swap counters
    pub swap_usage: MemoryData,

    /// Kernel memory counters (v1 only)
    pub kernel_usage: MemoryData,

    /// Page cache (bytes)
    pub cache: u64,

    /// Every key/value pair found in `memory.stat`
    pub stats: HashMap<String, u64>,
}

impl MemoryReport {
    /// Get current usage in MB
    pub fn usage_mb(&self) -> u64 {
        self.usage.usage / 1024 / 1024
    }

    /// Get peak usage in MB
    pub fn max_usage_mb(&self) -> u64 {
        self.usage.max_usage / 1024 / 1024
    }
}
