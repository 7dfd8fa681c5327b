use mend_risk::{validate_risk_weighted_budget, CandidateFile, RiskBudget};
use mend_snapshot::MendPaths;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct CandidateInput {
    path: String,
    #[serde(default)]
    loc_changed: Option<u32>,
}

/// Evaluate a proposed file set against the configured budget and print the
/// per-file weight breakdown.
pub fn execute(repo_root: &Path, file: &str, recipes: usize, json: bool) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("cannot read candidate file {file}: {e}"))?;
    let inputs: Vec<CandidateInput> = serde_json::from_str(&content)?;
    let files: Vec<CandidateFile> = inputs
        .iter()
        .map(|i| CandidateFile::new(&i.path, i.loc_changed))
        .collect();

    let paths = MendPaths::discover(repo_root);
    let budget = RiskBudget::load(&paths.config_json)?;
    let decision = validate_risk_weighted_budget(&files, recipes, &budget);

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    for entry in &decision.breakdown {
        match entry.weight {
            Some(w) => println!(
                "  {} ({}, {} loc) weight {:.2}",
                entry.path, entry.tier, entry.loc_changed, w
            ),
            None => println!("  {} ({}) BLOCKED", entry.path, entry.tier),
        }
    }
    println!(
        "weighted impact: {:.2} / {}",
        decision.weighted_impact, budget.max_files
    );
    if decision.allowed {
        println!("admitted");
    } else {
        println!("rejected:");
        for violation in &decision.violations {
            println!("  - {violation}");
        }
    }
    Ok(())
}
