use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::formats::ListEntry;

pub const SNAPSHOT_FILE_NAME: &str = "MyAnimeList.json";

pub fn snapshot_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SNAPSHOT_FILE_NAME)
}

/// Writes the full list, replacing any previous snapshot.
pub async fn write(path: &Path, entries: &[ListEntry]) -> anyhow::Result<()> {
    let data = serde_json::to_vec_pretty(entries).context("serialize snapshot")?;
    crate::fsutil::write_atomic(path, &data)
        .await
        .with_context(|| format!("write snapshot: {}", path.display()))?;
    Ok(())
}

/// Reads a snapshot written by [`write`]. A missing or malformed file is an error.
pub async fn read(path: &Path) -> anyhow::Result<Vec<ListEntry>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read snapshot: {}", path.display()))?;
    let entries = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse snapshot: {}", path.display()))?;
    Ok(entries)
}
