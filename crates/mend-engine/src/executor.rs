//! Applies one recipe to its target files, guarded by execution
//! constraints, with no partial application: a protected path skips the
//! whole recipe, and any mid-recipe error unwinds the writes already made
//! through the before-state snapshot.

use crate::candidate::MutationCandidate;
use crate::constraints::ExecutionConstraints;
use crate::mask::mask_secrets;
use crate::traits::Recipe;
use mend_core::diff::{diff_stats, unified_diff};
use mend_snapshot::{RollbackOptions, SnapshotStore};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecipeStatus {
    Executed,
    Skipped,
    Failed,
    RolledBack,
}

impl std::fmt::Display for RecipeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecipeStatus::Executed => write!(f, "executed"),
            RecipeStatus::Skipped => write!(f, "skipped"),
            RecipeStatus::Failed => write!(f, "failed"),
            RecipeStatus::RolledBack => write!(f, "rolled-back"),
        }
    }
}

/// Diff of one file change, with real line counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: String,
    pub diff: String,
    pub lines_added: usize,
    pub lines_removed: usize,
}

/// Always produced per attempt; empty for skipped and failed attempts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionEvidence {
    pub files_modified: Vec<String>,
    pub loc_changed: usize,
    pub diffs: Vec<FileDiff>,
    pub risk_reduction_estimate: f64,
    pub execution_time_ms: u64,
    pub justification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeExecutionResult {
    pub recipe_id: String,
    pub status: RecipeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub evidence: ExecutionEvidence,
    /// Populated by the orchestrator when the safe strategy re-verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<crate::verifier::VerificationResult>,
}

impl RecipeExecutionResult {
    pub fn skipped(recipe_id: &str, reason: String) -> Self {
        Self {
            recipe_id: recipe_id.to_string(),
            status: RecipeStatus::Skipped,
            reason: Some(reason),
            evidence: ExecutionEvidence::default(),
            verification: None,
        }
    }

    pub fn failed(recipe_id: &str, reason: String) -> Self {
        Self {
            recipe_id: recipe_id.to_string(),
            status: RecipeStatus::Failed,
            reason: Some(reason),
            evidence: ExecutionEvidence::default(),
            verification: None,
        }
    }
}

/// Constraint re-validation, run before any disk write. Returns the skip
/// reason if the whole recipe must be skipped. A protected path is never
/// partially applied around.
pub fn preflight(candidate: &MutationCandidate, constraints: &ExecutionConstraints) -> Option<String> {
    for file in &candidate.target_files {
        let path = &file.classification.path;
        if constraints.is_protected(path) {
            return Some(format!("{path} matches a protected path pattern"));
        }
        if !constraints.category_allowed(file.classification.category) {
            return Some(format!(
                "{path} is category {} which is not allowed by policy",
                file.classification.category
            ));
        }
    }
    if candidate.target_files.len() > constraints.max_files {
        return Some(format!(
            "{} files exceeds the per-recipe limit of {}",
            candidate.target_files.len(),
            constraints.max_files
        ));
    }
    if candidate.estimated_loc_changed > constraints.max_loc {
        return Some(format!(
            "estimated {} LOC exceeds the per-recipe limit of {}",
            candidate.estimated_loc_changed, constraints.max_loc
        ));
    }
    None
}

/// Re-validate against constraints, then apply the recipe file by file.
///
/// `snapshot_id` must name the before-state snapshot taken for this recipe;
/// it is the undo source if anything throws mid-way.
pub fn execute_recipe(
    recipe: &dyn Recipe,
    candidate: &MutationCandidate,
    constraints: &ExecutionConstraints,
    store: &mut SnapshotStore,
    snapshot_id: &str,
) -> RecipeExecutionResult {
    if let Some(reason) = preflight(candidate, constraints) {
        return RecipeExecutionResult::skipped(&candidate.recipe_id, reason);
    }

    let started = Instant::now();
    let root = store.paths.root.clone();
    let mut written: Vec<String> = Vec::new();
    let mut diffs: Vec<FileDiff> = Vec::new();
    let mut issues_addressed = 0usize;

    for rel in candidate.paths() {
        let full = root.join(&rel);
        // A detector may reference a file that has since moved; that is a
        // per-file skip, not a recipe failure.
        if !full.exists() {
            warn!(path = %rel, "target file missing, skipping");
            continue;
        }

        let outcome: anyhow::Result<()> = (|| {
            let before = std::fs::read_to_string(&full)?;
            let mut content = before.clone();
            for issue in candidate.issues_for(&rel) {
                content = recipe.apply(&content, issue)?;
                issues_addressed += 1;
            }
            if content == before {
                return Ok(());
            }
            std::fs::write(&full, &content)?;
            written.push(rel.clone());

            let stats = diff_stats(&before, &content);
            diffs.push(FileDiff {
                path: rel.clone(),
                diff: mask_secrets(&unified_diff(&rel, &before, &content)),
                lines_added: stats.lines_added,
                lines_removed: stats.lines_removed,
            });
            Ok(())
        })();

        if let Err(e) = outcome {
            // Unwind everything written so far, plus the file that may hold
            // a partial write.
            let mut restore = written.clone();
            if !restore.contains(&rel) {
                restore.push(rel.clone());
            }
            let mut reason = format!("recipe {} failed on {rel}: {e}", recipe.id());
            match store.rollback(&RollbackOptions {
                snapshot_id: Some(snapshot_id.to_string()),
                files: Some(restore),
                ..Default::default()
            }) {
                Ok(report) if !report.success => {
                    warn!(snapshot = snapshot_id, "partial-write rollback incomplete");
                    reason.push_str("; partial-write rollback incomplete");
                }
                Err(rollback_err) => {
                    warn!(snapshot = snapshot_id, error = %rollback_err, "partial-write rollback failed");
                    reason.push_str(&format!("; rollback failed: {rollback_err}"));
                }
                Ok(_) => {}
            }
            return RecipeExecutionResult::failed(&candidate.recipe_id, reason);
        }
    }

    let loc_changed = diffs
        .iter()
        .map(|d| d.lines_added + d.lines_removed)
        .sum();
    debug!(recipe = recipe.id(), files = written.len(), loc_changed, "recipe applied");

    RecipeExecutionResult {
        recipe_id: candidate.recipe_id.clone(),
        status: RecipeStatus::Executed,
        reason: None,
        verification: None,
        evidence: ExecutionEvidence {
            justification: format!(
                "applied {} to {} file(s), addressing {} finding(s)",
                recipe.name(),
                written.len(),
                issues_addressed
            ),
            files_modified: written,
            loc_changed,
            diffs,
            risk_reduction_estimate: candidate.risk_reduction_estimate,
            execution_time_ms: started.elapsed().as_millis() as u64,
        },
    }
}
