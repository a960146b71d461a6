//! Per-version control file naming
//!
//! A group directory uses exactly one schema for its whole life, so the
//! variant is picked once when the path is resolved and every writer and
//! reader asks it for file names instead of branching on the version.

use std::fmt;

use crate::types::SchemaVersion;

/// File names and capabilities of one cgroup schema generation
pub trait SchemaVariant: fmt::Debug + Send + Sync {
    fn version(&self) -> SchemaVersion;

    /// Hard limit file
    fn limit_file(&self) -> &'static str;

    /// Soft limit file
    fn reservation_file(&self) -> &'static str;

    /// Swap limit file
    fn swap_limit_file(&self) -> &'static str;

    /// Kernel memory limit file, if the schema has one
    fn kernel_limit_file(&self) -> Option<&'static str>;

    /// OOM control file, if the schema has one
    fn oom_control_file(&self) -> Option<&'static str>;

    /// Swappiness file, if the schema has one
    fn swappiness_file(&self) -> Option<&'static str>;

    /// Key in `memory.stat` holding the page cache size
    fn cache_stat_key(&self) -> &'static str;

    /// Suffix of the usage counter in every namespace
    fn usage_counter(&self) -> &'static str;

    /// Namespace holding swap counters
    fn swap_namespace(&self) -> &'static str;

    /// Whether kernel memory is accounted separately
    fn applies_kernel_memory(&self) -> bool;

    /// Whether namespaces expose `max_usage_in_bytes` and `failcnt`
    fn tracks_watermarks(&self) -> bool;
}

/// Legacy v1 hierarchy
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacySchema;

impl SchemaVariant for LegacySchema {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::V1
    }

    fn limit_file(&self) -> &'static str {
        "memory.limit_in_bytes"
    }

    fn reservation_file(&self) -> &'static str {
        "memory.soft_limit_in_bytes"
    }

    fn swap_limit_file(&self) -> &'static str {
        "memory.memsw.limit_in_bytes"
    }

    fn kernel_limit_file(&self) -> Option<&'static str> {
        Some("memory.kmem.limit_in_bytes")
    }

    fn oom_control_file(&self) -> Option<&'static str> {
        Some("memory.oom_control")
    }

    fn swappiness_file(&self) -> Option<&'static str> {
        Some("memory.swappiness")
    }

    fn cache_stat_key(&self) -> &'static str {
        "cache"
    }

    fn usage_counter(&self) -> &'static str {
        "usage_in_bytes"
    }

    fn swap_namespace(&self) -> &'static str {
        "memsw"
    }

    fn applies_kernel_memory(&self) -> bool {
        true
    }

    fn tracks_watermarks(&self) -> bool {
        true
    }
}

/// Unified v2 hierarchy
#[derive(Debug, Clone, Copy, Default)]
pub struct UnifiedSchema;

impl SchemaVariant for UnifiedSchema {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::V2
    }

    fn limit_file(&self) -> &'static str {
        "memory.max"
    }

    fn reservation_file(&self) -> &'static str {
        "memory.low"
    }

    fn swap_limit_file(&self) -> &'static str {
        "memory.swap.max"
    }

    fn kernel_limit_file(&self) -> Option<&'static str> {
        None
    }

    fn oom_control_file(&self) -> Option<&'static str> {
        None
    }

    fn swappiness_file(&self) -> Option<&'static str> {
        None
    }

    fn cache_stat_key(&self) -> &'static str {
        "file"
    }

    fn usage_counter(&self) -> &'static str {
        "current"
    }

    fn swap_namespace(&self) -> &'static str {
        "swap"
    }

    fn applies_kernel_memory(&self) -> bool {
        false
    }

    fn tracks_watermarks(&self) -> bool {
        false
    }
}
