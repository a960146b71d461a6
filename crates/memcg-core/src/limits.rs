//! Limit writing

use tracing::debug;

use crate::error::{CgroupError, Result};
use crate::types::{GroupPath, ResourceSpec, SWAPPINESS_UNSET};
use crate::utils::write_control_file;

/// Writes the populated fields of a [`ResourceSpec`] into a group directory
pub struct LimitWriter;

impl LimitWriter {
    /// Write every populated limit, in a fixed order
    ///
    /// Stops at the first failing write. Files written before the failure
    /// keep their new values.
    ///
    /// # Examples
    /// ```no_run
    /// use memcg_core::{GroupPath, LimitWriter, ResourceSpec, SchemaVersion};
    ///
    /// fn main() -> memcg_core::Result<()> {
    ///     let group = GroupPath::new("/sys/fs/cgroup/memory/app", SchemaVersion::V1);
    ///     LimitWriter::set(&group, &ResourceSpec::new().with_memory(512 << 20))?;
    ///     Ok(())
    /// }
    /// ```
    pub fn set(group: &GroupPath, spec: &ResourceSpec) -> Result<()> {
        let schema = group.schema();
        let dir = group.path();

        if spec.memory != 0 {
            Self::write(group, schema.limit_file(), spec.memory)?;
        }

        if spec.memory_reservation != 0 {
            Self::write(group, schema.reservation_file(), spec.memory_reservation)?;
        }

        if spec.memory_swap > 0 {
            Self::write(group, schema.swap_limit_file(), spec.memory_swap)?;
        }

        if spec.kernel_memory > 0 {
            if let Some(name) = schema.kernel_limit_file() {
                Self::write(group, name, spec.kernel_memory)?;
            }
        }

        if spec.oom_kill_disable {
            if let Some(name) = schema.oom_control_file() {
                write_control_file(dir, name, "1")?;
                debug!("Disabled OOM killer for {:?}", dir);
            }
        }

        if let Some(name) = schema.swappiness_file() {
            match spec.memory_swappiness {
                s @ 0..=100 => Self::write(group, name, s)?,
                SWAPPINESS_UNSET => {}
                s => {
                    return Err(CgroupError::ValidationError(format!(
                        "invalid value: {}, valid memory swappiness range is 0-100",
                        s
                    )))
                }
            }
        }

        Ok(())
    }

    fn write(group: &GroupPath, name: &str, value: i64) -> Result<()> {
        write_control_file(group.path(), name, &value.to_string())?;
        debug!("Set {} = {} in {:?}", name, value, group.path());
        Ok(())
    }
}
