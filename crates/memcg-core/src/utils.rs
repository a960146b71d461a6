//! Utility functions for control file access

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::trace;

use crate::error::{CgroupError, Result};

/// Safe read file to string
pub fn read_control_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| CgroupError::control_file(path, e))
}

/// Write `value` into the control file `name` of directory `dir`
pub fn write_control_file(dir: &Path, name: &str, value: &str) -> Result<()> {
    let path = dir.join(name);
    trace!("writing {:?} <- {}", path, value);
    fs::write(&path, value).map_err(|e| CgroupError::control_file(&path, e))
}

/// Read a single-value counter file as an unsigned integer
pub fn read_control_uint(dir: &Path, name: &str) -> Result<u64> {
    let path = dir.join(name);
    let content = read_control_file(&path)?;

    parse_uint(content.trim()).map_err(|_| {
        CgroupError::ParseError(format!("Invalid value in {:?}: {:?}", path, content.trim()))
    })
}

/// Parse a counter value
///
/// `max` maps to `u64::MAX`; negative numbers clamp to 0, the kernel reports
/// some unset counters as `-1`.
pub fn parse_uint(value: &str) -> std::result::Result<u64, std::num::ParseIntError> {
    if value == "max" {
        return Ok(u64::MAX);
    }

    match value.parse::<u64>() {
        Ok(v) => Ok(v),
        Err(e) => match value.parse::<i64>() {
            Ok(v) if v < 0 => Ok(0),
            _ => Err(e),
        },
    }
}

/// Parse a `key value` line
///
/// Fields are separated by exactly one space
pub fn parse_key_value(line: &str) -> Result<(String, u64)> {
    let parts: Vec<&str> = line.split(' ').collect();
    let (key, value) = match parts.as_slice() {
        [key, value] => (*key, *value),
        _ => {
            return Err(CgroupError::ParseError(format!(
                "Invalid key/value line: {:?}",
                line
            )))
        }
    };

    let value = parse_uint(value)
        .map_err(|e| CgroupError::ParseError(format!("Parse error for {}: {}", key, e)))?;

    Ok((key.to_string(), value))
}

/// Parse memory stat file
///
/// Format:
/// ```text
/// cache 1048576
/// rss 2097152
/// ```
pub fn parse_memory_stat(content: &str) -> Result<HashMap<String, u64>> {
    let mut values = HashMap::new();

    for line in content.lines() {
        let (key, value) = parse_key_value(line).map_err(|e| {
            CgroupError::ParseError(format!("Failed to parse memory.stat ({:?}): {}", line, e))
        })?;
        values.insert(key, value);
    }

    Ok(values)
}
