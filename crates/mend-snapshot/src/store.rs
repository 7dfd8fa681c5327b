//! Snapshot & undo store.
//!
//! Captures pre-mutation file content as compressed payloads, finalizes
//! after-hashes and diffs post-mutation, and restores any subset of files
//! losslessly. The metadata index is replaced atomically after all per-file
//! work completes; that write is the store's only critical section.

use crate::index::{self, FileOperation, Snapshot, SnapshotFile, SnapshotIndex};
use crate::paths::MendPaths;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use mend_core::diff::unified_diff;
use mend_core::hash::sha256_hex;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Retention window for undo history. Cleanup is explicit, never implicit.
pub const DEFAULT_SNAPSHOT_KEEP_DAYS: u32 = 30;

/// Snapshot selection for a rollback. Selectors resolve in order:
/// explicit id, then most-recent by recipe, then nearest-by-time, then the
/// most recent snapshot overall.
#[derive(Debug, Clone, Default)]
pub struct RollbackOptions {
    pub snapshot_id: Option<String>,
    pub recipe_id: Option<String>,
    pub timestamp: Option<i64>,
    /// Restore only these paths, leaving the snapshot's other files as-is.
    pub files: Option<Vec<String>>,
    pub dry_run: bool,
}

/// One file that could not be restored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackReport {
    pub snapshot_id: String,
    pub success: bool,
    pub files_restored: usize,
    pub files_skipped: usize,
    pub errors: Vec<RestoreError>,
    /// Would-be restore diff, present only for dry runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_diff: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub total_snapshots: usize,
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub compressed_size_bytes: u64,
    pub compression_ratio: f64,
    pub oldest_snapshot: Option<String>,
    pub newest_snapshot: Option<String>,
}

/// The snapshot store: paths plus the in-memory index handle.
pub struct SnapshotStore {
    pub paths: MendPaths,
    index: SnapshotIndex,
}

impl SnapshotStore {
    /// Open an existing workspace. Fails if `.mend/` does not exist.
    pub fn open(repo_root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let paths = MendPaths::discover(repo_root);
        if !paths.is_initialized() {
            anyhow::bail!(
                "not a mend workspace ({}/.mend not found). Run `mend init` first.",
                paths.root.display()
            );
        }
        let index = index::load_index(&paths.index_json)?;
        Ok(Self { paths, index })
    }

    /// Open a workspace, creating the `.mend/` layout if needed.
    pub fn init(repo_root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let paths = MendPaths::discover(repo_root);
        paths.ensure_layout()?;
        let index = index::load_index(&paths.index_json)?;
        Ok(Self { paths, index })
    }

    pub fn index(&self) -> &SnapshotIndex {
        &self.index
    }

    /// Capture the before-state of `files` (workspace-relative paths) ahead
    /// of a recipe execution. Returns the new snapshot id.
    ///
    /// Files that do not exist yet are recorded as `created` with no
    /// payload: rolling them back deletes whatever the recipe wrote.
    pub fn create_snapshot(
        &mut self,
        recipe_id: &str,
        recipe_name: &str,
        files: &[String],
        tags: &[String],
    ) -> anyhow::Result<String> {
        let now = time::OffsetDateTime::now_utc();
        let ts = now.format(&time::format_description::well_known::Rfc3339)?;
        let id = format!(
            "snap_{}",
            &sha256_hex(format!("{recipe_id}:{}", now.unix_timestamp_nanos()).as_bytes())[..16]
        );
        let payload_dir = self.paths.payload_dir(&id);

        let mut records = Vec::with_capacity(files.len());
        let mut total_size_bytes = 0u64;
        for rel in files {
            let path = self.paths.root.join(rel);
            if !path.exists() {
                records.push(SnapshotFile {
                    path: rel.clone(),
                    operation: FileOperation::Created,
                    before_hash: None,
                    after_hash: None,
                    diff: None,
                    size_bytes: 0,
                    compressed_bytes: 0,
                    payload_key: None,
                });
                continue;
            }
            let content = std::fs::read(&path)?;
            let key = payload_key(rel);
            let compressed = compress(&content)?;
            write_payload(&payload_dir, &key, &compressed)?;
            total_size_bytes += content.len() as u64;
            records.push(SnapshotFile {
                path: rel.clone(),
                operation: FileOperation::Modified,
                before_hash: Some(sha256_hex(&content)),
                after_hash: None,
                diff: None,
                size_bytes: content.len() as u64,
                compressed_bytes: compressed.len() as u64,
                payload_key: Some(key),
            });
        }

        let snapshot = Snapshot {
            id: id.clone(),
            ts,
            ts_unix: now.unix_timestamp(),
            recipe_id: recipe_id.to_string(),
            recipe_name: recipe_name.to_string(),
            parent: self.index.newest().map(|s| s.id.clone()),
            compressed: true,
            total_size_bytes,
            tags: tags.to_vec(),
            files: records,
        };

        // All per-file payloads are on disk before the index is replaced.
        self.index.snapshots.push(snapshot);
        index::save_index(&self.paths.index_json, &self.index)?;
        debug!(snapshot = %id, files = files.len(), "snapshot created");
        Ok(id)
    }

    /// Finalize a snapshot after its mutation ran: record after-hashes and,
    /// where content actually changed, a unified diff. A file whose after
    /// hash equals its before hash was a no-op and gets no diff.
    pub fn update_snapshot(&mut self, snapshot_id: &str) -> anyhow::Result<()> {
        let paths = self.paths.clone();
        let snapshot = self
            .index
            .get_mut(snapshot_id)
            .ok_or_else(|| anyhow::anyhow!("snapshot not found: {snapshot_id}"))?;
        let payload_dir = paths.payload_dir(snapshot_id);

        for file in &mut snapshot.files {
            let path = paths.root.join(&file.path);
            if !path.exists() {
                if file.before_hash.is_some() {
                    file.operation = FileOperation::Deleted;
                }
                file.after_hash = None;
                continue;
            }
            let after = std::fs::read(&path)?;
            let after_hash = sha256_hex(&after);
            if file.before_hash.as_deref() == Some(after_hash.as_str()) {
                file.after_hash = Some(after_hash);
                continue;
            }

            let before = match &file.payload_key {
                Some(key) => decompress(&read_payload(&payload_dir, key)?)?,
                None => Vec::new(),
            };
            // Text diff only for text content; binary files keep hashes only.
            if let (Ok(before_text), Ok(after_text)) = (
                String::from_utf8(before),
                String::from_utf8(after.clone()),
            ) {
                let diff = unified_diff(&file.path, &before_text, &after_text);
                if !diff.is_empty() {
                    file.diff = Some(diff);
                }
            }
            file.after_hash = Some(after_hash);
        }

        index::save_index(&self.paths.index_json, &self.index)?;
        Ok(())
    }

    fn resolve_snapshot(&self, options: &RollbackOptions) -> anyhow::Result<&Snapshot> {
        if let Some(id) = &options.snapshot_id {
            return self
                .index
                .get(id)
                .ok_or_else(|| anyhow::anyhow!("snapshot not found: {id}"));
        }
        if let Some(recipe_id) = &options.recipe_id {
            return self
                .index
                .snapshots
                .iter()
                .rev()
                .find(|s| s.recipe_id == *recipe_id)
                .ok_or_else(|| anyhow::anyhow!("no snapshot for recipe: {recipe_id}"));
        }
        if let Some(ts) = options.timestamp {
            return self
                .index
                .snapshots
                .iter()
                .min_by_key(|s| (s.ts_unix - ts).abs())
                .ok_or_else(|| anyhow::anyhow!("no snapshots to roll back"));
        }
        self.index
            .newest()
            .ok_or_else(|| anyhow::anyhow!("no snapshots to roll back"))
    }

    /// Restore files to their snapshotted before-state.
    ///
    /// Per-file failures are collected rather than aborting the rest of the
    /// restore; `success` is true only when no file failed. A dry run never
    /// writes and returns the would-be diff as `preview_diff`.
    pub fn rollback(&self, options: &RollbackOptions) -> anyhow::Result<RollbackReport> {
        let snapshot = self.resolve_snapshot(options)?;
        let payload_dir = self.paths.payload_dir(&snapshot.id);

        let selected: Vec<&SnapshotFile> = match &options.files {
            Some(subset) => snapshot
                .files
                .iter()
                .filter(|f| subset.iter().any(|s| s == &f.path))
                .collect(),
            None => snapshot.files.iter().collect(),
        };

        let mut errors: Vec<RestoreError> = Vec::new();
        // Requested paths the snapshot never captured are skips, not silent no-ops.
        if let Some(subset) = &options.files {
            for requested in subset {
                if !snapshot.files.iter().any(|f| &f.path == requested) {
                    errors.push(RestoreError {
                        path: requested.clone(),
                        message: format!("not captured in snapshot {}", snapshot.id),
                    });
                }
            }
        }

        let mut files_restored = 0;
        let mut preview = String::new();
        for file in &selected {
            match self.restore_file(&payload_dir, file, options.dry_run) {
                Ok(Some(diff)) => {
                    preview.push_str(&diff);
                    files_restored += 1;
                }
                Ok(None) => files_restored += 1,
                Err(e) => {
                    warn!(path = %file.path, error = %e, "restore failed");
                    errors.push(RestoreError {
                        path: file.path.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(RollbackReport {
            snapshot_id: snapshot.id.clone(),
            success: errors.is_empty(),
            files_restored,
            files_skipped: errors.len(),
            errors,
            preview_diff: options
                .dry_run
                .then(|| preview)
                .filter(|p| !p.is_empty()),
        })
    }

    /// Restore one file. Returns the preview diff for dry runs.
    fn restore_file(
        &self,
        payload_dir: &Path,
        file: &SnapshotFile,
        dry_run: bool,
    ) -> anyhow::Result<Option<String>> {
        let target = self.paths.root.join(&file.path);

        let before = match (&file.payload_key, file.operation) {
            (_, FileOperation::Created) => Vec::new(),
            (Some(key), _) => {
                let bytes = decompress(&read_payload(payload_dir, key)?)?;
                let before_hash = file
                    .before_hash
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("snapshot record has no before hash"))?;
                if sha256_hex(&bytes) != before_hash {
                    anyhow::bail!("payload integrity check failed for {}", file.path);
                }
                bytes
            }
            (None, _) => anyhow::bail!("snapshot record has no payload for {}", file.path),
        };

        if dry_run {
            let current = std::fs::read(&target).unwrap_or_default();
            let diff = match (String::from_utf8(current), String::from_utf8(before)) {
                (Ok(cur), Ok(prev)) => unified_diff(&file.path, &cur, &prev),
                _ => format!("binary restore: {}\n", file.path),
            };
            return Ok((!diff.is_empty()).then_some(diff));
        }

        match file.operation {
            FileOperation::Created => {
                if target.exists() {
                    std::fs::remove_file(&target)?;
                }
            }
            FileOperation::Modified | FileOperation::Deleted => {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&target, &before)?;
            }
        }
        Ok(None)
    }

    /// Add a tag to a snapshot. Tagged snapshots are retained indefinitely.
    pub fn tag(&mut self, snapshot_id: &str, tag: &str) -> anyhow::Result<()> {
        let snapshot = self
            .index
            .get_mut(snapshot_id)
            .ok_or_else(|| anyhow::anyhow!("snapshot not found: {snapshot_id}"))?;
        if !snapshot.tags.iter().any(|t| t == tag) {
            snapshot.tags.push(tag.to_string());
        }
        index::save_index(&self.paths.index_json, &self.index)?;
        Ok(())
    }

    /// Remove a tag from a snapshot, making it eligible for cleanup again.
    pub fn untag(&mut self, snapshot_id: &str, tag: &str) -> anyhow::Result<()> {
        let snapshot = self
            .index
            .get_mut(snapshot_id)
            .ok_or_else(|| anyhow::anyhow!("snapshot not found: {snapshot_id}"))?;
        snapshot.tags.retain(|t| t != tag);
        index::save_index(&self.paths.index_json, &self.index)?;
        Ok(())
    }

    /// Snapshots past the retention window that `cleanup` would delete.
    /// Tagged snapshots are never eligible.
    pub fn expired(&self, keep_days: u32) -> Vec<&Snapshot> {
        let cutoff = retention_cutoff(keep_days);
        self.index
            .snapshots
            .iter()
            .filter(|s| s.ts_unix < cutoff && s.tags.is_empty())
            .collect()
    }

    /// Remove snapshots older than the retention window, including their
    /// payloads, and rewrite the index without them. Tagged snapshots are
    /// kept indefinitely. This is the only operation that destroys undo
    /// history. Returns the number of snapshots deleted.
    pub fn cleanup(&mut self, keep_days: u32) -> anyhow::Result<usize> {
        let cutoff = retention_cutoff(keep_days);
        let snapshots = std::mem::take(&mut self.index.snapshots);
        let (expired, kept): (Vec<Snapshot>, Vec<Snapshot>) = snapshots
            .into_iter()
            .partition(|s| s.ts_unix < cutoff && s.tags.is_empty());

        for snap in &expired {
            let dir = self.paths.payload_dir(&snap.id);
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(&dir) {
                    warn!(snapshot = %snap.id, error = %e, "failed to remove payloads");
                }
            }
        }

        self.index.snapshots = kept;
        index::save_index(&self.paths.index_json, &self.index)?;
        Ok(expired.len())
    }

    /// Read-only reporting over the index. No side effects.
    pub fn stats(&self) -> SnapshotStats {
        let total_size_bytes: u64 = self.index.snapshots.iter().map(|s| s.total_size_bytes).sum();
        let compressed_size_bytes: u64 = self
            .index
            .snapshots
            .iter()
            .flat_map(|s| s.files.iter())
            .map(|f| f.compressed_bytes)
            .sum();
        SnapshotStats {
            total_snapshots: self.index.snapshots.len(),
            total_files: self.index.snapshots.iter().map(|s| s.files.len()).sum(),
            total_size_bytes,
            compressed_size_bytes,
            compression_ratio: if total_size_bytes == 0 {
                1.0
            } else {
                compressed_size_bytes as f64 / total_size_bytes as f64
            },
            oldest_snapshot: self.index.snapshots.first().map(|s| s.id.clone()),
            newest_snapshot: self.index.snapshots.last().map(|s| s.id.clone()),
        }
    }
}

fn retention_cutoff(keep_days: u32) -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp() - i64::from(keep_days) * 86_400
}

/// Storage key for a path: blake3 of the slash-normalized path, first 32
/// hex chars. Scoped under the snapshot's payload directory.
fn payload_key(rel_path: &str) -> String {
    let normalized = rel_path.replace('\\', "/");
    blake3::hash(normalized.as_bytes()).to_hex()[..32].to_string()
}

fn compress(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

fn decompress(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Atomic payload write: tmp file in the payload dir, then rename.
fn write_payload(dir: &Path, key: &str, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    let tmp_path = dir.join(format!(".tmp_{key}"));
    let mut file = std::fs::File::create(&tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&tmp_path, dir.join(key))?;
    Ok(())
}

fn read_payload(dir: &Path, key: &str) -> anyhow::Result<Vec<u8>> {
    let path = dir.join(key);
    if !path.exists() {
        anyhow::bail!("payload not found: {}", path.display());
    }
    Ok(std::fs::read(&path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, SnapshotStore) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/a.ts"), "const a = 1;\n").unwrap();
        std::fs::write(tmp.path().join("src/b.ts"), "const b = 2;\n").unwrap();
        let store = SnapshotStore::init(tmp.path()).unwrap();
        (tmp, store)
    }

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn open_without_init_fails() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(SnapshotStore::open(tmp.path()).is_err());
    }

    #[test]
    fn snapshot_records_hashes_and_parent_chain() {
        let (_tmp, mut store) = setup();
        let first = store
            .create_snapshot("r1", "Recipe one", &files(&["src/a.ts"]), &[])
            .unwrap();
        let second = store
            .create_snapshot("r2", "Recipe two", &files(&["src/b.ts"]), &[])
            .unwrap();

        let index = store.index();
        assert_eq!(index.snapshots.len(), 2);
        assert_eq!(index.get(&first).unwrap().parent, None);
        assert_eq!(
            index.get(&second).unwrap().parent.as_deref(),
            Some(first.as_str())
        );
        let file = &index.get(&first).unwrap().files[0];
        assert_eq!(
            file.before_hash.as_deref(),
            Some(sha256_hex(b"const a = 1;\n").as_str())
        );
        assert!(file.compressed_bytes > 0);
    }

    #[test]
    fn update_snapshot_stores_diff_only_on_change() {
        let (tmp, mut store) = setup();
        let id = store
            .create_snapshot("r1", "", &files(&["src/a.ts", "src/b.ts"]), &[])
            .unwrap();

        // mutate a.ts, leave b.ts alone
        std::fs::write(tmp.path().join("src/a.ts"), "const a = 42;\n").unwrap();
        store.update_snapshot(&id).unwrap();

        let snap = store.index().get(&id).unwrap();
        let a = snap.files.iter().find(|f| f.path == "src/a.ts").unwrap();
        let b = snap.files.iter().find(|f| f.path == "src/b.ts").unwrap();
        assert!(a.diff.as_deref().unwrap().contains("-const a = 1;"));
        assert_ne!(a.after_hash, a.before_hash);
        assert!(b.diff.is_none());
        assert_eq!(b.after_hash, b.before_hash);
    }

    #[test]
    fn rollback_round_trip_restores_before_hash() {
        let (tmp, mut store) = setup();
        let id = store
            .create_snapshot("r1", "", &files(&["src/a.ts"]), &[])
            .unwrap();
        std::fs::write(tmp.path().join("src/a.ts"), "mutated beyond repair\n").unwrap();
        store.update_snapshot(&id).unwrap();

        let report = store
            .rollback(&RollbackOptions {
                snapshot_id: Some(id.clone()),
                ..Default::default()
            })
            .unwrap();
        assert!(report.success);
        assert_eq!(report.files_restored, 1);

        let restored = std::fs::read(tmp.path().join("src/a.ts")).unwrap();
        let snap = store.index().get(&id).unwrap();
        assert_eq!(
            Some(sha256_hex(&restored).as_str()),
            snap.files[0].before_hash.as_deref()
        );
    }

    #[test]
    fn selective_rollback_leaves_other_files_mutated() {
        let (tmp, mut store) = setup();
        let id = store
            .create_snapshot("r1", "", &files(&["src/a.ts", "src/b.ts"]), &[])
            .unwrap();
        std::fs::write(tmp.path().join("src/a.ts"), "a mutated\n").unwrap();
        std::fs::write(tmp.path().join("src/b.ts"), "b mutated\n").unwrap();
        store.update_snapshot(&id).unwrap();

        let report = store
            .rollback(&RollbackOptions {
                snapshot_id: Some(id),
                files: Some(files(&["src/a.ts"])),
                ..Default::default()
            })
            .unwrap();
        assert!(report.success);
        assert_eq!(report.files_restored, 1);

        let a = std::fs::read_to_string(tmp.path().join("src/a.ts")).unwrap();
        let b = std::fs::read_to_string(tmp.path().join("src/b.ts")).unwrap();
        assert_eq!(a, "const a = 1;\n");
        assert_eq!(b, "b mutated\n");
    }

    #[test]
    fn rollback_by_recipe_picks_most_recent_match() {
        let (tmp, mut store) = setup();
        store
            .create_snapshot("fix-imports", "", &files(&["src/a.ts"]), &[])
            .unwrap();
        std::fs::write(tmp.path().join("src/a.ts"), "second state\n").unwrap();
        let second = store
            .create_snapshot("fix-imports", "", &files(&["src/a.ts"]), &[])
            .unwrap();
        std::fs::write(tmp.path().join("src/a.ts"), "third state\n").unwrap();

        let report = store
            .rollback(&RollbackOptions {
                recipe_id: Some("fix-imports".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(report.snapshot_id, second);
        let content = std::fs::read_to_string(tmp.path().join("src/a.ts")).unwrap();
        assert_eq!(content, "second state\n");
    }

    #[test]
    fn dry_run_writes_nothing_and_previews() {
        let (tmp, mut store) = setup();
        let id = store
            .create_snapshot("r1", "", &files(&["src/a.ts"]), &[])
            .unwrap();
        std::fs::write(tmp.path().join("src/a.ts"), "const a = 99;\n").unwrap();

        let report = store
            .rollback(&RollbackOptions {
                snapshot_id: Some(id),
                dry_run: true,
                ..Default::default()
            })
            .unwrap();
        assert!(report.success);
        let preview = report.preview_diff.unwrap();
        assert!(preview.contains("-const a = 99;"));
        assert!(preview.contains("+const a = 1;"));

        // still mutated on disk
        let content = std::fs::read_to_string(tmp.path().join("src/a.ts")).unwrap();
        assert_eq!(content, "const a = 99;\n");
    }

    #[test]
    fn created_file_rolls_back_to_absent() {
        let (tmp, mut store) = setup();
        let id = store
            .create_snapshot("r1", "", &files(&["src/new.ts"]), &[])
            .unwrap();
        std::fs::write(tmp.path().join("src/new.ts"), "brand new\n").unwrap();
        store.update_snapshot(&id).unwrap();

        let snap = store.index().get(&id).unwrap();
        assert_eq!(snap.files[0].operation, FileOperation::Created);

        let report = store
            .rollback(&RollbackOptions {
                snapshot_id: Some(id),
                ..Default::default()
            })
            .unwrap();
        assert!(report.success);
        assert!(!tmp.path().join("src/new.ts").exists());
    }

    #[test]
    fn requested_file_not_in_snapshot_is_a_skip() {
        let (_tmp, mut store) = setup();
        let id = store
            .create_snapshot("r1", "", &files(&["src/a.ts"]), &[])
            .unwrap();

        let report = store
            .rollback(&RollbackOptions {
                snapshot_id: Some(id),
                files: Some(files(&["src/other.ts"])),
                ..Default::default()
            })
            .unwrap();
        assert!(!report.success);
        assert_eq!(report.files_restored, 0);
        assert_eq!(report.files_skipped, 1);
        assert!(report.errors[0].message.contains("not captured"));
    }

    #[test]
    fn cleanup_removes_expired_keeps_tagged_and_recent() {
        let (_tmp, mut store) = setup();
        let old = store
            .create_snapshot("r1", "", &files(&["src/a.ts"]), &[])
            .unwrap();
        let pinned = store
            .create_snapshot("r2", "", &files(&["src/a.ts"]), &["keep".to_string()])
            .unwrap();
        let recent = store
            .create_snapshot("r3", "", &files(&["src/b.ts"]), &[])
            .unwrap();

        // age the first two past the retention window
        let forty_days = 40 * 86_400;
        for id in [&old, &pinned] {
            let snap = store.index.get_mut(id).unwrap();
            snap.ts_unix -= forty_days;
        }

        let deleted = store.cleanup(DEFAULT_SNAPSHOT_KEEP_DAYS).unwrap();
        assert_eq!(deleted, 1);
        assert!(store.index().get(&old).is_none());
        assert!(store.index().get(&pinned).is_some());
        assert!(store.index().get(&recent).is_some());
        assert!(!store.paths.payload_dir(&old).exists());
        assert!(store.paths.payload_dir(&pinned).exists());
    }

    #[test]
    fn tag_pins_through_cleanup_untag_releases() {
        let (_tmp, mut store) = setup();
        let id = store
            .create_snapshot("r1", "", &files(&["src/a.ts"]), &[])
            .unwrap();
        store.tag(&id, "keep").unwrap();
        store.tag(&id, "keep").unwrap(); // idempotent
        assert_eq!(store.index().get(&id).unwrap().tags, vec!["keep"]);

        store.index.get_mut(&id).unwrap().ts_unix -= 90 * 86_400;
        assert!(store.expired(DEFAULT_SNAPSHOT_KEEP_DAYS).is_empty());

        store.untag(&id, "keep").unwrap();
        assert_eq!(store.expired(DEFAULT_SNAPSHOT_KEEP_DAYS).len(), 1);
        assert!(store.tag("snap_missing", "x").is_err());
    }

    #[test]
    fn stats_reports_totals_and_ratio() {
        let (_tmp, mut store) = setup();
        assert_eq!(store.stats().total_snapshots, 0);
        assert_eq!(store.stats().compression_ratio, 1.0);

        store
            .create_snapshot("r1", "", &files(&["src/a.ts", "src/b.ts"]), &[])
            .unwrap();
        let stats = store.stats();
        assert_eq!(stats.total_snapshots, 1);
        assert_eq!(stats.total_files, 2);
        assert!(stats.total_size_bytes > 0);
        assert!(stats.compressed_size_bytes > 0);
        assert!(stats.oldest_snapshot.is_some());
    }

    #[test]
    fn payload_integrity_checked_before_restore() {
        let (tmp, mut store) = setup();
        let id = store
            .create_snapshot("r1", "", &files(&["src/a.ts"]), &[])
            .unwrap();
        std::fs::write(tmp.path().join("src/a.ts"), "mutated\n").unwrap();

        // corrupt the payload on disk
        let key = store.index().get(&id).unwrap().files[0]
            .payload_key
            .clone()
            .unwrap();
        let payload_path = store.paths.payload_dir(&id).join(&key);
        std::fs::write(&payload_path, compress(b"tampered content").unwrap()).unwrap();

        let report = store
            .rollback(&RollbackOptions {
                snapshot_id: Some(id),
                ..Default::default()
            })
            .unwrap();
        assert!(!report.success);
        assert!(report.errors[0].message.contains("integrity"));
        // the mutated file was not overwritten with tampered bytes
        let content = std::fs::read_to_string(tmp.path().join("src/a.ts")).unwrap();
        assert_eq!(content, "mutated\n");
    }
}
