use mend_attest::AttestationLog;
use mend_snapshot::MendPaths;
use std::path::Path;

pub fn verify(repo_root: &Path) -> anyhow::Result<()> {
    let paths = MendPaths::discover(repo_root);
    let log = AttestationLog::new(paths.attest_jsonl);
    let entries = log.entries().unwrap_or_default().len();
    if log.verify()? {
        println!("attestation chain OK ({entries} entries)");
        Ok(())
    } else {
        anyhow::bail!("attestation chain FAILED verification ({entries} entries)")
    }
}

pub fn log(repo_root: &Path, limit: usize, json: bool) -> anyhow::Result<()> {
    let paths = MendPaths::discover(repo_root);
    let log = AttestationLog::new(paths.attest_jsonl);
    let entries = log.entries()?;
    let shown = if limit == 0 || entries.len() <= limit {
        &entries[..]
    } else {
        &entries[entries.len() - limit..]
    };

    for entry in shown {
        if json {
            println!("{}", serde_json::to_string(entry)?);
        } else {
            let verdict = if entry.improved { "improved" } else { "regressed" };
            println!(
                "{} {} {} {} file(s) {verdict}",
                entry.ts,
                entry.session_id,
                entry.recipe_id,
                entry.files_modified.len(),
            );
        }
    }
    Ok(())
}
