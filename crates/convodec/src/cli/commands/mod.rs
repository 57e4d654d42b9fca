pub mod clean;
pub mod report;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Reads one export file: a JSON array of raw conversation records.
pub fn read_export(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read export file: {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&content)
        .with_context(|| format!("export file is not valid JSON: {}", path.display()))?;
    match parsed {
        Value::Array(records) => Ok(records),
        _ => anyhow::bail!(
            "export file must hold a JSON array of conversations: {}",
            path.display()
        ),
    }
}
