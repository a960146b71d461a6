//! Human-readable byte sizes for flags and output

use byte_unit::{Byte, UnitType};

/// Parse a size flag such as `512MiB`, `1G` or `1048576`
///
/// `-1` passes through unchanged; the kernel reads it as "unlimited".
pub fn parse_size(value: &str) -> Result<i64, String> {
    let value = value.trim();
    if value == "-1" {
        return Ok(-1);
    }

    let bytes = Byte::parse_str(value, true)
        .map_err(|e| format!("invalid size {:?}: {}", value, e))?;

    i64::try_from(bytes.as_u64()).map_err(|_| format!("size {:?} is too large", value))
}

/// Format a byte count with a binary unit
pub fn format_bytes(bytes: u64) -> String {
    if bytes == u64::MAX {
        return "max".to_string();
    }
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{:.2}", adjusted)
}
