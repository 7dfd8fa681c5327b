use mend_attest::AttestationLog;
use mend_risk::RiskBudget;
use mend_snapshot::SnapshotStore;
use std::path::Path;

pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let store = SnapshotStore::open(repo_root)?;
    let stats = store.stats();
    let budget = RiskBudget::load(&store.paths.config_json)?;
    let log = AttestationLog::new(store.paths.attest_jsonl.clone());

    println!("Workspace: {}", store.paths.mend_dir.display());
    println!(
        "Budget: {} weighted files / {} LOC / {} recipes per session",
        budget.max_files, budget.max_loc_changed, budget.max_recipes_per_session
    );
    println!(
        "Snapshots: {} ({} files, {} bytes compressed)",
        stats.total_snapshots, stats.total_files, stats.compressed_size_bytes
    );
    if let Some(newest) = &stats.newest_snapshot {
        println!("Newest snapshot: {newest}");
    }

    let entries = log.entries()?.len();
    let chain = if log.verify()? { "OK" } else { "BROKEN" };
    println!("Attestation: {entries} entries, chain {chain}");
    Ok(())
}
