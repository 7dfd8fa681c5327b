//! Snapshot metadata index: a single JSON file listing every snapshot,
//! replaced atomically on each mutation so a concurrent reader never sees a
//! torn write. Records are append-only; only `cleanup` removes them.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// What the mutation did to a file, as observed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    /// File did not exist before the mutation. Rollback deletes it.
    Created,
    Modified,
    /// File existed before and was gone afterwards.
    Deleted,
}

/// One file captured in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub path: String,
    pub operation: FileOperation,
    /// SHA-256 of pre-mutation content. `None` for created files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_hash: Option<String>,
    /// SHA-256 of post-mutation content, populated by `update_snapshot`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_hash: Option<String>,
    /// Unified diff, stored only when the content actually changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    pub size_bytes: u64,
    #[serde(default)]
    pub compressed_bytes: u64,
    /// Storage key of the compressed payload (blake3 of the path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_key: Option<String>,
}

/// One immutable snapshot record. `parent` links form an append-only
/// history, never a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub ts: String,
    pub ts_unix: i64,
    pub recipe_id: String,
    #[serde(default)]
    pub recipe_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub compressed: bool,
    pub total_size_bytes: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub files: Vec<SnapshotFile>,
}

/// In-memory view of `index.json`. Passed by handle into store
/// operations, never ambient global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotIndex {
    pub snapshots: Vec<Snapshot>,
}

impl SnapshotIndex {
    pub fn get(&self, snapshot_id: &str) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.id == snapshot_id)
    }

    pub fn get_mut(&mut self, snapshot_id: &str) -> Option<&mut Snapshot> {
        self.snapshots.iter_mut().find(|s| s.id == snapshot_id)
    }

    /// Most recent snapshot, if any.
    pub fn newest(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }
}

/// Load `index.json`. A missing file is an empty index.
pub fn load_index(path: &Path) -> anyhow::Result<SnapshotIndex> {
    if !path.exists() {
        return Ok(SnapshotIndex::default());
    }
    let content = std::fs::read_to_string(path)?;
    let index: SnapshotIndex = serde_json::from_str(&content)?;
    Ok(index)
}

/// Save `index.json` atomically: write to a temp file in the same
/// directory, then persist over the target.
pub fn save_index(path: &Path, index: &SnapshotIndex) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    std::fs::create_dir_all(parent)?;
    let json = serde_json::to_string_pretty(index)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(json.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot(id: &str, ts_unix: i64) -> Snapshot {
        Snapshot {
            id: id.to_string(),
            ts: "2026-08-01T00:00:00Z".to_string(),
            ts_unix,
            recipe_id: "remove-unused-imports".to_string(),
            recipe_name: "Remove unused imports".to_string(),
            parent: None,
            compressed: true,
            total_size_bytes: 120,
            tags: Vec::new(),
            files: vec![SnapshotFile {
                path: "src/app.ts".to_string(),
                operation: FileOperation::Modified,
                before_hash: Some("aa".repeat(32)),
                after_hash: None,
                diff: None,
                size_bytes: 120,
                compressed_bytes: 60,
                payload_key: Some("deadbeef".to_string()),
            }],
        }
    }

    #[test]
    fn missing_index_is_empty() {
        let index = load_index(Path::new("/nonexistent/index.json")).unwrap();
        assert!(index.snapshots.is_empty());
    }

    #[test]
    fn round_trip_preserves_records() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.json");

        let mut index = SnapshotIndex::default();
        index.snapshots.push(sample_snapshot("snap_1", 100));
        let mut second = sample_snapshot("snap_2", 200);
        second.parent = Some("snap_1".to_string());
        index.snapshots.push(second);

        save_index(&path, &index).unwrap();
        let loaded = load_index(&path).unwrap();

        assert_eq!(loaded.snapshots.len(), 2);
        assert_eq!(loaded.snapshots[1].parent.as_deref(), Some("snap_1"));
        assert_eq!(loaded.newest().unwrap().id, "snap_2");
        assert_eq!(loaded.get("snap_1").unwrap().ts_unix, 100);
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.json");
        save_index(&path, &SnapshotIndex::default()).unwrap();
        save_index(&path, &SnapshotIndex::default()).unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(entries.len(), 1);
    }
}
