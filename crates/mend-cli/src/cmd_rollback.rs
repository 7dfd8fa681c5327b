use mend_snapshot::{RollbackOptions, SnapshotStore, WorkspaceLock};
use std::path::Path;

pub fn execute(
    repo_root: &Path,
    snapshot: Option<&str>,
    recipe: Option<&str>,
    timestamp: Option<&str>,
    files: &[String],
    dry_run: bool,
) -> anyhow::Result<()> {
    let store = SnapshotStore::open(repo_root)?;
    let _lock = WorkspaceLock::acquire(&store.paths)?;

    let ts_unix = match timestamp {
        Some(ts) => Some(
            time::OffsetDateTime::parse(ts, &time::format_description::well_known::Rfc3339)
                .map_err(|e| anyhow::anyhow!("invalid --timestamp {ts}: {e}"))?
                .unix_timestamp(),
        ),
        None => None,
    };

    let report = store.rollback(&RollbackOptions {
        snapshot_id: snapshot.map(|s| s.to_string()),
        recipe_id: recipe.map(|s| s.to_string()),
        timestamp: ts_unix,
        files: (!files.is_empty()).then(|| files.to_vec()),
        dry_run,
    })?;

    if dry_run {
        println!("dry run against {}", report.snapshot_id);
        match &report.preview_diff {
            Some(diff) => print!("{diff}"),
            None => println!("(no changes to restore)"),
        }
        return Ok(());
    }

    println!(
        "{}: restored {} file(s), skipped {}",
        report.snapshot_id, report.files_restored, report.files_skipped
    );
    for error in &report.errors {
        eprintln!("  {}: {}", error.path, error.message);
    }
    if !report.success {
        anyhow::bail!("rollback completed with {} error(s)", report.errors.len());
    }
    Ok(())
}
