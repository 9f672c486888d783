//! Snapshot persistence: the downstream collaborator boundary.
//!
//! Completed snapshots land under `data/snapshots/<source>/` as timestamped
//! JSON files; a fatal listing failure leaves an explicit `{"error": ...}`
//! record instead of a silent empty snapshot.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::data_paths::DataPaths;
use crate::types::Snapshot;

pub fn save_snapshot(paths: &DataPaths, source: &str, snapshot: &Snapshot) -> Result<PathBuf> {
    let path = output_path(paths, source, "snapshot")?;
    let body = serde_json::to_string_pretty(snapshot)?;
    fs::write(&path, body)
        .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
    info!(
        path = %path.display(),
        markets = snapshot.market_count,
        tokens = snapshot.token_count,
        "snapshot saved"
    );
    Ok(path)
}

pub fn save_error(paths: &DataPaths, source: &str, reason: &str) -> Result<PathBuf> {
    let path = output_path(paths, source, "error")?;
    let body = serde_json::to_string_pretty(&json!({ "error": reason }))?;
    fs::write(&path, body)
        .with_context(|| format!("Failed to write error record to {}", path.display()))?;
    info!(path = %path.display(), reason, "error record saved");
    Ok(path)
}

fn output_path(paths: &DataPaths, source: &str, prefix: &str) -> Result<PathBuf> {
    let dir = paths.snapshots().join(source);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let name = format!("{}_{}.json", prefix, Utc::now().format("%Y%m%d_%H%M%S"));
    Ok(dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::assemble;
    use tempfile::tempdir;

    #[test]
    fn snapshot_round_trips_to_disk() {
        let dir = tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        let snapshot = assemble(Vec::new(), 0, Utc::now());

        let path = save_snapshot(&paths, "opinion", &snapshot).unwrap();
        assert!(path.starts_with(paths.snapshots().join("opinion")));

        let body = fs::read_to_string(path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["market_count"], 0);
        assert!(value["markets"].as_array().unwrap().is_empty());
    }

    #[test]
    fn error_record_is_explicit() {
        let dir = tempdir().unwrap();
        let paths = DataPaths::new(dir.path());

        let path = save_error(&paths, "predict", "first listing page failed").unwrap();
        let body = fs::read_to_string(path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["error"], "first listing page failed");
    }
}
