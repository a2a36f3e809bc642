//! Utility functions for shardfs

use crate::common::{Error, Result};
use std::path::{Component, Path};

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

/// Validate a file or shard name received over the wire.
///
/// Names are relative paths below a storage directory: non-empty, no control
/// characters, and made only of normal components (no `..`, no root).
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(|c| c.is_control()) {
        return Err(Error::InvalidName(name.to_string()));
    }

    let escapes = Path::new(name)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(Error::InvalidName(name.to_string()));
    }

    Ok(())
}
