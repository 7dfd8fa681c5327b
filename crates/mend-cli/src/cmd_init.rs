use mend_engine::ExecutionConstraints;
use mend_snapshot::MendPaths;
use std::path::Path;

pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let paths = MendPaths::discover(repo_root);

    if paths.is_initialized() {
        // Heal a partially created layout, then report
        paths.ensure_layout()?;
        println!("Already initialized at {}", paths.mend_dir.display());
        return Ok(());
    }

    paths.ensure_layout()?;

    if !paths.config_json.exists() {
        let default_config = serde_json::json!({
            "budget.max_files": mend_risk::budget::DEFAULT_MAX_FILES,
            "budget.max_loc_changed": mend_risk::budget::DEFAULT_MAX_LOC_CHANGED,
            "budget.max_recipes_per_session": mend_risk::budget::DEFAULT_MAX_RECIPES_PER_SESSION,
            "gc.snapshot_keep_days": mend_snapshot::DEFAULT_SNAPSHOT_KEEP_DAYS,
        });
        std::fs::write(
            &paths.config_json,
            serde_json::to_string_pretty(&default_config)?,
        )?;
    }

    if !paths.policy_yaml.exists() {
        std::fs::write(
            &paths.policy_yaml,
            ExecutionConstraints::default_policy_yaml().as_bytes(),
        )?;
    }

    println!("Initialized .mend/ at {}", paths.mend_dir.display());
    Ok(())
}
