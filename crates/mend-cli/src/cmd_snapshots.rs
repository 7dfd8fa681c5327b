use mend_snapshot::{SnapshotStore, WorkspaceLock};
use std::path::Path;

const PIN_TAG: &str = "pinned";

pub fn pin(repo_root: &Path, snapshot_id: &str, pinned: bool) -> anyhow::Result<()> {
    let mut store = SnapshotStore::open(repo_root)?;
    let _lock = WorkspaceLock::acquire(&store.paths)?;
    if pinned {
        store.tag(snapshot_id, PIN_TAG)?;
        println!("pinned {snapshot_id}");
    } else {
        store.untag(snapshot_id, PIN_TAG)?;
        println!("unpinned {snapshot_id}");
    }
    Ok(())
}

pub fn list(repo_root: &Path, json: bool) -> anyhow::Result<()> {
    let store = SnapshotStore::open(repo_root)?;
    let snapshots = &store.index().snapshots;

    if json {
        for snapshot in snapshots {
            println!("{}", serde_json::to_string(snapshot)?);
        }
        return Ok(());
    }

    if snapshots.is_empty() {
        println!("no snapshots");
        return Ok(());
    }
    for snapshot in snapshots {
        let tags = if snapshot.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", snapshot.tags.join(", "))
        };
        println!(
            "{} {} {} ({} files, {} bytes){tags}",
            snapshot.ts,
            snapshot.id,
            snapshot.recipe_id,
            snapshot.files.len(),
            snapshot.total_size_bytes,
        );
    }
    Ok(())
}

pub fn stats(repo_root: &Path, json: bool) -> anyhow::Result<()> {
    let store = SnapshotStore::open(repo_root)?;
    let stats = store.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("snapshots: {}", stats.total_snapshots);
    println!("files captured: {}", stats.total_files);
    println!(
        "size: {} bytes ({} compressed, ratio {:.2})",
        stats.total_size_bytes, stats.compressed_size_bytes, stats.compression_ratio
    );
    if let Some(oldest) = &stats.oldest_snapshot {
        println!("oldest: {oldest}");
    }
    if let Some(newest) = &stats.newest_snapshot {
        println!("newest: {newest}");
    }
    Ok(())
}
