use mend_snapshot::{SnapshotStore, WorkspaceLock, DEFAULT_SNAPSHOT_KEEP_DAYS};
use std::path::Path;

/// Read a numeric key from the flat config map, if present.
fn read_config_u32(config_json: &Path, key: &str) -> Option<u32> {
    let content = std::fs::read_to_string(config_json).ok()?;
    let value: serde_json::Value = serde_json::from_str(&content).ok()?;
    value.get(key)?.as_u64().map(|v| v as u32)
}

pub fn execute(repo_root: &Path, dry_run: bool, keep_days: Option<u32>) -> anyhow::Result<()> {
    let mut store = SnapshotStore::open(repo_root)?;
    let keep_days = keep_days.unwrap_or_else(|| {
        read_config_u32(&store.paths.config_json, "gc.snapshot_keep_days")
            .unwrap_or(DEFAULT_SNAPSHOT_KEEP_DAYS)
    });

    if dry_run {
        let expired = store.expired(keep_days);
        if expired.is_empty() {
            println!("nothing to delete (retention {keep_days} days)");
            return Ok(());
        }
        println!("would delete {} snapshot(s):", expired.len());
        for snapshot in expired {
            println!("  {} {} {}", snapshot.ts, snapshot.id, snapshot.recipe_id);
        }
        return Ok(());
    }

    let _lock = WorkspaceLock::acquire(&store.paths)?;
    let deleted = store.cleanup(keep_days)?;
    println!("deleted {deleted} snapshot(s) (retention {keep_days} days)");
    Ok(())
}
