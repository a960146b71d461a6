//! Memory statistics collection

use tracing::debug;

use crate::error::{CgroupError, Result};
use crate::schema::SchemaVariant;
use crate::types::{GroupPath, MemoryData, MemoryReport};
use crate::utils::{parse_memory_stat, read_control_file, read_control_uint};

const BASE_NAMESPACE: &str = "memory";
const KERNEL_NAMESPACE: &str = "kmem";

/// Reads counter files of a group into a [`MemoryReport`]
pub struct StatsCollector;

impl StatsCollector {
    /// Collect memory statistics
    ///
    /// Best effort: a group without `memory.stat` reports all zeros. Only the
    /// base `memory.*` counters are mandatory once the stat file exists.
    pub fn get_stats(group: &GroupPath) -> Result<MemoryReport> {
        let schema = group.schema();
        let stat_path = group.path().join("memory.stat");

        let content = match read_control_file(&stat_path) {
            Ok(content) => content,
            Err(e) if e.is_not_found() => {
                debug!("No memory.stat in {:?}, reporting zeros", group.path());
                return Ok(MemoryReport::default());
            }
            Err(e) => return Err(e),
        };

        let mut report = MemoryReport {
            stats: parse_memory_stat(&content)?,
            ..Default::default()
        };
        report.cache = report
            .stats
            .get(schema.cache_stat_key())
            .copied()
            .unwrap_or(0);

        report.usage = Self::memory_data(group, schema, None)?;
        report.swap_usage = Self::memory_data(group, schema, Some(schema.swap_namespace()))?;

        if schema.applies_kernel_memory() {
            report.kernel_usage = Self::memory_data(group, schema, Some(KERNEL_NAMESPACE))?;
        }

        Ok(report)
    }

    /// Read the counters of one namespace
    ///
    /// Sub-namespaces (swap, kmem) may be compiled out of the kernel; any
    /// missing file there yields zeroed data for the whole namespace.
    fn memory_data(
        group: &GroupPath,
        schema: &dyn SchemaVariant,
        namespace: Option<&str>,
    ) -> Result<MemoryData> {
        let module = match namespace {
            Some(ns) => format!("{}.{}", BASE_NAMESPACE, ns),
            None => BASE_NAMESPACE.to_string(),
        };
        let optional = namespace.is_some();

        let read = |counter: &str| -> Result<Option<u64>> {
            let name = format!("{}.{}", module, counter);
            match read_control_uint(group.path(), &name) {
                Ok(value) => Ok(Some(value)),
                Err(e) if optional && e.is_not_found() => {
                    debug!("{} missing in {:?}, treating as zero", name, group.path());
                    Ok(None)
                }
                Err(CgroupError::NotFound(path)) => Err(CgroupError::NotFound(format!(
                    "required counter {} ({})",
                    name, path
                ))),
                Err(e) => Err(e),
            }
        };

        let mut data = MemoryData::default();

        match read(schema.usage_counter())? {
            Some(usage) => data.usage = usage,
            None => return Ok(MemoryData::default()),
        }

        if !schema.tracks_watermarks() {
            return Ok(data);
        }

        match read("max_usage_in_bytes")? {
            Some(max_usage) => data.max_usage = max_usage,
            None => return Ok(MemoryData::default()),
        }

        match read("failcnt")? {
            Some(failcnt) => data.failcnt = failcnt,
            None => return Ok(MemoryData::default()),
        }

        Ok(data)
    }
}
