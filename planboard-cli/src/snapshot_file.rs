//! Reading and writing board snapshot files.
//!
//! The format follows the extension: `.yaml`/`.yml` are YAML, anything else
//! is JSON.

use anyhow::{Context, Result};
use planboard::BoardSnapshot;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Snapshot file encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Yaml,
}

impl SnapshotFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

/// Load a snapshot file
pub fn read_snapshot(path: &Path) -> Result<BoardSnapshot> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let snapshot = match SnapshotFormat::for_path(path) {
        SnapshotFormat::Yaml => BoardSnapshot::from_yaml(&text),
        SnapshotFormat::Json => BoardSnapshot::from_json(&text),
    }
    .with_context(|| format!("invalid snapshot {}", path.display()))?;
    debug!(path = %path.display(), tasks = snapshot.tasks.len(), "read snapshot");
    Ok(snapshot)
}

/// Write a snapshot file
pub fn write_snapshot(path: &Path, snapshot: &BoardSnapshot) -> Result<()> {
    let mut text = match SnapshotFormat::for_path(path) {
        SnapshotFormat::Yaml => snapshot.to_yaml()?,
        SnapshotFormat::Json => snapshot.to_json()?,
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    fs::write(path, text).with_context(|| format!("failed to write snapshot {}", path.display()))?;
    debug!(path = %path.display(), "wrote snapshot");
    Ok(())
}
