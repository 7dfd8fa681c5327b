//! Drives a session: Admission → Snapshot → Execute → Verify →
//! Commit/Rollback per recipe, strictly sequentially, short-circuiting on
//! the first failure or regression. Every attempted mutation lands in the
//! attestation log whether it was kept or unwound.

use crate::candidate::MutationCandidate;
use crate::constraints::ExecutionConstraints;
use crate::executor::{self, RecipeExecutionResult, RecipeStatus};
use crate::session::{aggregate_outcome, RecipeStage, RecipeState, SessionOutcome};
use crate::traits::{Detector, Recipe};
use crate::verifier::revalidate;
use mend_attest::AttestationLog;
use mend_risk::{validate_risk_weighted_budget, FixStrategy, RiskBudget};
use mend_snapshot::{RollbackOptions, SnapshotStore, WorkspaceLock};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: String,
    pub outcome: SessionOutcome,
    pub results: Vec<RecipeExecutionResult>,
    pub started_at: String,
    pub finished_at: String,
}

/// Most severe fix strategy across a candidate's files: one safe-tier file
/// makes the whole candidate verify before committing.
fn candidate_strategy(candidate: &MutationCandidate) -> FixStrategy {
    candidate
        .target_files
        .iter()
        .map(|f| FixStrategy::for_tier(f.classification.tier))
        .fold(FixStrategy::Rewrite, |acc, s| match (acc, s) {
            (FixStrategy::ManualReviewRequired, _) | (_, FixStrategy::ManualReviewRequired) => {
                FixStrategy::ManualReviewRequired
            }
            (FixStrategy::Safe, _) | (_, FixStrategy::Safe) => FixStrategy::Safe,
            _ => FixStrategy::Rewrite,
        })
}

fn now_rfc3339() -> anyhow::Result<String> {
    Ok(time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)?)
}

/// Read current contents of the candidate's files for attestation hashing.
/// Missing files contribute empty content.
fn read_contents(root: &Path, paths: &[String]) -> Vec<Vec<u8>> {
    paths
        .iter()
        .map(|p| std::fs::read(root.join(p)).unwrap_or_default())
        .collect()
}

/// Single entry point for external orchestration: run a sequence of
/// recipes under the session budget. Always returns a structured outcome
/// with a full evidence trail; never aborts the process mid-session.
pub fn execute_session(
    root: &Path,
    candidates: &[MutationCandidate],
    recipes: &[&dyn Recipe],
    detectors: &[&dyn Detector],
    budget_overrides: Option<RiskBudget>,
) -> anyhow::Result<SessionResult> {
    let mut store = SnapshotStore::open(root)?;
    let _lock = WorkspaceLock::acquire(&store.paths)?;
    let budget = match budget_overrides {
        Some(b) => b,
        None => RiskBudget::load(&store.paths.config_json)?,
    };
    let constraints = ExecutionConstraints::load(&store.paths.policy_yaml)?;
    let attest_log = AttestationLog::new(store.paths.attest_jsonl.clone());

    let session_id = format!("ses_{}", ulid::Ulid::new().to_string().to_lowercase());
    let started_at = now_rfc3339()?;
    info!(session = %session_id, candidates = candidates.len(), "session started");

    let mut results: Vec<RecipeExecutionResult> = Vec::new();
    let mut statuses: Vec<RecipeStatus> = Vec::new();

    for candidate in candidates {
        let mut state = RecipeState::new(&candidate.recipe_id);

        // Admission: budget + per-file gate. Rejections are skips with every
        // violation listed, and do not halt the session.
        let decision =
            validate_risk_weighted_budget(&candidate.target_files, candidates.len(), &budget);
        if !decision.allowed {
            state.transition(RecipeStage::Skipped)?;
            results.push(RecipeExecutionResult::skipped(
                &candidate.recipe_id,
                decision.violations.join("; "),
            ));
            statuses.push(RecipeStatus::Skipped);
            continue;
        }

        let Some(recipe) = recipes.iter().find(|r| r.id() == candidate.recipe_id) else {
            state.transition(RecipeStage::Skipped)?;
            results.push(RecipeExecutionResult::skipped(
                &candidate.recipe_id,
                format!("no recipe registered with id {}", candidate.recipe_id),
            ));
            statuses.push(RecipeStatus::Skipped);
            continue;
        };

        // Executor-level constraint re-validation happens while still
        // validating, so a protected path skips before any snapshot exists.
        if let Some(reason) = executor::preflight(candidate, &constraints) {
            state.transition(RecipeStage::Skipped)?;
            results.push(RecipeExecutionResult::skipped(&candidate.recipe_id, reason));
            statuses.push(RecipeStatus::Skipped);
            continue;
        }

        let paths = candidate.paths();
        let before_contents = read_contents(root, &paths);
        let snapshot_id =
            store.create_snapshot(&candidate.recipe_id, recipe.name(), &paths, &[])?;

        state.transition(RecipeStage::Executing)?;
        let mut result = executor::execute_recipe(
            *recipe,
            candidate,
            &constraints,
            &mut store,
            &snapshot_id,
        );
        store.update_snapshot(&snapshot_id)?;
        let after_contents = read_contents(root, &paths);

        match result.status {
            RecipeStatus::Failed => {
                state.transition(RecipeStage::Failed)?;
            }
            RecipeStatus::Executed => match candidate_strategy(candidate) {
                FixStrategy::Rewrite => {
                    // low risk: no mandatory re-verification, still snapshotted
                    state.transition(RecipeStage::Committed)?;
                }
                _ => {
                    state.transition(RecipeStage::Verifying)?;
                    let verification = revalidate(detectors, root, &paths, &candidate.issues);
                    let regressed =
                        !verification.improved || verification.new_issues_introduced > 0;
                    if regressed {
                        let report = store.rollback(&RollbackOptions {
                            snapshot_id: Some(snapshot_id.clone()),
                            ..Default::default()
                        })?;
                        if !report.success {
                            warn!(snapshot = %snapshot_id, errors = report.errors.len(),
                                "regression rollback incomplete");
                        }
                        state.transition(RecipeStage::RolledBack)?;
                        result.status = RecipeStatus::RolledBack;
                        result.reason = Some(format!(
                            "verification found {} issue(s) after mutation (was {}), {} new",
                            verification.after_issue_count,
                            verification.before_issue_count,
                            verification.new_issues_introduced
                        ));
                    } else {
                        state.transition(RecipeStage::Committed)?;
                    }
                    result.verification = Some(verification);
                }
            },
            // executor only returns executed, skipped, or failed; skips were
            // handled during preflight above
            _ => {}
        }

        let improved = result.status == RecipeStatus::Executed;
        if let Err(e) = attest_log.attest(
            &session_id,
            &candidate.recipe_id,
            &result.evidence.files_modified,
            &before_contents,
            &after_contents,
            improved,
        ) {
            // attestation is an audit side-channel, not a correctness gate
            warn!(error = %e, "attestation append failed");
        }

        statuses.push(result.status);
        results.push(result);

        if state.halts_session() {
            info!(session = %session_id, recipe = %candidate.recipe_id,
                "halting session: recipe did not improve the tree");
            break;
        }
    }

    let outcome = aggregate_outcome(&statuses);
    info!(session = %session_id, outcome = %outcome, "session closed");
    Ok(SessionResult {
        session_id,
        outcome,
        results,
        started_at,
        finished_at: now_rfc3339()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mend_core::{Finding, Severity};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports one finding per line containing `FIXME`, with paths relative
    /// to the workspace root.
    struct FixmeDetector {
        root: PathBuf,
    }

    impl Detector for FixmeDetector {
        fn id(&self) -> &str {
            "fixme-check"
        }
        fn analyze(&self, path: &Path) -> anyhow::Result<Vec<Finding>> {
            let rel = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let content = std::fs::read_to_string(path).unwrap_or_default();
            Ok(content
                .lines()
                .enumerate()
                .filter(|(_, l)| l.contains("FIXME"))
                .map(|(i, line)| Finding {
                    file: rel.clone(),
                    line: i as u32 + 1,
                    message: format!("leftover marker: {}", line.trim()),
                    severity: Severity::Warning,
                    category: "hygiene".to_string(),
                    detector: "fixme-check".to_string(),
                })
                .collect())
        }
    }

    /// Removes every line containing FIXME.
    struct CleanupRecipe {
        id: &'static str,
        applied: AtomicUsize,
    }

    impl CleanupRecipe {
        fn new(id: &'static str) -> Self {
            Self {
                id,
                applied: AtomicUsize::new(0),
            }
        }
    }

    impl Recipe for CleanupRecipe {
        fn id(&self) -> &str {
            self.id
        }
        fn matches(&self, issue: &Finding) -> bool {
            issue.detector == "fixme-check"
        }
        fn apply(&self, content: &str, _issue: &Finding) -> anyhow::Result<String> {
            self.applied.fetch_add(1, Ordering::SeqCst);
            let kept: Vec<&str> = content
                .lines()
                .filter(|l| !l.contains("FIXME"))
                .collect();
            Ok(kept.join("\n") + "\n")
        }
    }

    /// "Fixes" the reported marker but plants two more.
    struct RegressingRecipe;

    impl Recipe for RegressingRecipe {
        fn id(&self) -> &str {
            "regressing"
        }
        fn matches(&self, _issue: &Finding) -> bool {
            true
        }
        fn apply(&self, content: &str, _issue: &Finding) -> anyhow::Result<String> {
            let cleaned = content.replace("FIXME", "ok");
            Ok(format!("{cleaned}// FIXME one\n// FIXME two\n"))
        }
    }

    fn setup(files: &[(&str, &str)]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let full = tmp.path().join(rel);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        SnapshotStore::init(tmp.path()).unwrap();
        tmp
    }

    fn candidate(root: &Path, recipe_id: &str, file: &str) -> MutationCandidate {
        let detector = FixmeDetector {
            root: root.to_path_buf(),
        };
        let findings = detector.analyze(&root.join(file)).unwrap();
        MutationCandidate::from_findings(recipe_id, findings, 10, 0.7)
    }

    #[test]
    fn session_of_improving_recipes_succeeds() {
        let tmp = setup(&[
            ("src/a.ts", "keep\n// FIXME drop\nkeep\n"),
            ("src/b.ts", "// FIXME here too\nfine\n"),
        ]);
        let recipe_a = CleanupRecipe::new("clean-a");
        let recipe_b = CleanupRecipe::new("clean-b");
        let detector = FixmeDetector {
            root: tmp.path().to_path_buf(),
        };
        let candidates = vec![
            candidate(tmp.path(), "clean-a", "src/a.ts"),
            candidate(tmp.path(), "clean-b", "src/b.ts"),
        ];

        let result = execute_session(
            tmp.path(),
            &candidates,
            &[&recipe_a, &recipe_b],
            &[&detector],
            None,
        )
        .unwrap();

        assert_eq!(result.outcome, SessionOutcome::Success);
        assert_eq!(result.results.len(), 2);
        assert!(result
            .results
            .iter()
            .all(|r| r.status == RecipeStatus::Executed));
        let a = std::fs::read_to_string(tmp.path().join("src/a.ts")).unwrap();
        assert_eq!(a, "keep\nkeep\n");

        // both attempts attested, chain intact
        let log = AttestationLog::new(tmp.path().join(".mend/attest.jsonl"));
        assert_eq!(log.entries().unwrap().len(), 2);
        assert!(log.verify().unwrap());

        // verification evidence recorded for safe-tier files
        assert!(result.results[0].verification.as_ref().unwrap().improved);
    }

    #[test]
    fn regression_rolls_back_and_halts_session() {
        let tmp = setup(&[
            ("src/a.ts", "// FIXME a\ncode\n"),
            ("src/b.ts", "// FIXME b\ncode\n"),
            ("src/c.ts", "// FIXME c\ncode\n"),
        ]);
        let good = CleanupRecipe::new("good");
        let bad = RegressingRecipe;
        let never_run = CleanupRecipe::new("never-run");
        let detector = FixmeDetector {
            root: tmp.path().to_path_buf(),
        };
        let candidates = vec![
            candidate(tmp.path(), "good", "src/a.ts"),
            candidate(tmp.path(), "regressing", "src/b.ts"),
            candidate(tmp.path(), "never-run", "src/c.ts"),
        ];

        let result = execute_session(
            tmp.path(),
            &candidates,
            &[&good, &bad, &never_run],
            &[&detector],
            None,
        )
        .unwrap();

        assert_eq!(result.outcome, SessionOutcome::Partial);
        assert_eq!(result.results.len(), 2); // third never attempted
        assert_eq!(result.results[0].status, RecipeStatus::Executed);
        assert_eq!(result.results[1].status, RecipeStatus::RolledBack);
        assert_eq!(never_run.applied.load(Ordering::SeqCst), 0);

        // the regressed file was restored to its pre-mutation content
        let b = std::fs::read_to_string(tmp.path().join("src/b.ts")).unwrap();
        assert_eq!(b, "// FIXME b\ncode\n");
        // the first improvement was kept
        let a = std::fs::read_to_string(tmp.path().join("src/a.ts")).unwrap();
        assert_eq!(a, "code\n");

        // rolled-back attempt still attested, marked not improved
        let log = AttestationLog::new(tmp.path().join(".mend/attest.jsonl"));
        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].improved);
        assert!(!entries[1].improved);
    }

    #[test]
    fn critical_file_candidate_is_skipped_not_halted() {
        let tmp = setup(&[
            ("config/.env", "SECRET=FIXME\n"),
            ("src/a.ts", "// FIXME a\ncode\n"),
        ]);
        let env_recipe = CleanupRecipe::new("touch-env");
        let good = CleanupRecipe::new("good");
        let detector = FixmeDetector {
            root: tmp.path().to_path_buf(),
        };
        let candidates = vec![
            candidate(tmp.path(), "touch-env", "config/.env"),
            candidate(tmp.path(), "good", "src/a.ts"),
        ];

        let result = execute_session(
            tmp.path(),
            &candidates,
            &[&env_recipe, &good],
            &[&detector],
            None,
        )
        .unwrap();

        assert_eq!(result.results[0].status, RecipeStatus::Skipped);
        assert!(result.results[0]
            .reason
            .as_deref()
            .unwrap()
            .contains("manual review"));
        assert_eq!(env_recipe.applied.load(Ordering::SeqCst), 0);
        // the session moved on and succeeded overall
        assert_eq!(result.results[1].status, RecipeStatus::Executed);
        assert_eq!(result.outcome, SessionOutcome::Success);
        // untouched
        let env = std::fs::read_to_string(tmp.path().join("config/.env")).unwrap();
        assert_eq!(env, "SECRET=FIXME\n");
    }

    #[test]
    fn budget_overrides_are_respected() {
        let tmp = setup(&[("src/a.ts", "// FIXME a\ncode\n")]);
        let recipe = CleanupRecipe::new("good");
        let detector = FixmeDetector {
            root: tmp.path().to_path_buf(),
        };
        let candidates = vec![candidate(tmp.path(), "good", "src/a.ts")];

        let tight = RiskBudget {
            max_files: 10,
            max_loc_changed: 2, // candidate estimates 10 LOC
            max_recipes_per_session: 5,
        };
        let result =
            execute_session(tmp.path(), &candidates, &[&recipe], &[&detector], Some(tight))
                .unwrap();

        assert_eq!(result.results[0].status, RecipeStatus::Skipped);
        assert!(result.results[0]
            .reason
            .as_deref()
            .unwrap()
            .contains("exceeds budget"));
    }

    #[test]
    fn unknown_recipe_is_skipped() {
        let tmp = setup(&[("src/a.ts", "// FIXME a\n")]);
        let detector = FixmeDetector {
            root: tmp.path().to_path_buf(),
        };
        let candidates = vec![candidate(tmp.path(), "ghost-recipe", "src/a.ts")];

        let result =
            execute_session(tmp.path(), &candidates, &[], &[&detector], None).unwrap();
        assert_eq!(result.results[0].status, RecipeStatus::Skipped);
        assert_eq!(result.outcome, SessionOutcome::Success);
    }

    #[test]
    fn empty_candidate_list_closes_clean() {
        let tmp = setup(&[]);
        let result = execute_session(tmp.path(), &[], &[], &[], None).unwrap();
        assert_eq!(result.outcome, SessionOutcome::Success);
        assert!(result.results.is_empty());
    }
}
