//! Admission control: decides which file mutations are allowed and whether a
//! candidate batch fits the session's risk-weighted budget.
//!
//! Rejections here are values, never errors. Every violation is listed so a
//! caller can report all reasons at once. Admission failures fail closed.

use crate::budget::RiskBudget;
use mend_core::{classify, FileCategory, FileClassification, RiskTier};
use serde::{Deserialize, Serialize};

/// How a file may be fixed once admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixStrategy {
    /// Critical tier: automation must not touch it.
    ManualReviewRequired,
    /// High/medium tier: apply, verify, roll back on regression.
    Safe,
    /// Low tier: apply without mandatory re-verification, still snapshotted.
    Rewrite,
}

impl std::fmt::Display for FixStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixStrategy::ManualReviewRequired => write!(f, "manual-review-required"),
            FixStrategy::Safe => write!(f, "safe"),
            FixStrategy::Rewrite => write!(f, "rewrite"),
        }
    }
}

impl FixStrategy {
    pub fn for_tier(tier: RiskTier) -> Self {
        match tier {
            RiskTier::Critical => FixStrategy::ManualReviewRequired,
            RiskTier::High | RiskTier::Medium => FixStrategy::Safe,
            RiskTier::Low => FixStrategy::Rewrite,
        }
    }
}

/// Per-path gate decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModificationDecision {
    pub allowed: bool,
    pub category: FileCategory,
    pub tier: RiskTier,
    pub fix_strategy: FixStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Gate a single path. Critical-tier files are always blocked.
pub fn should_allow_modification(path: &str) -> ModificationDecision {
    let c = classify(path);
    let fix_strategy = FixStrategy::for_tier(c.tier);
    let block_reason = (c.tier == RiskTier::Critical).then(|| {
        format!(
            "{} is {} risk ({}): manual review required before any automated change",
            c.path, c.tier, c.category
        )
    });
    ModificationDecision {
        allowed: block_reason.is_none(),
        category: c.category,
        tier: c.tier,
        fix_strategy,
        block_reason,
    }
}

/// One file in a candidate mutation batch, with its LOC estimate if known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFile {
    pub classification: FileClassification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc_changed: Option<u32>,
}

impl CandidateFile {
    pub fn new(path: &str, loc_changed: Option<u32>) -> Self {
        Self {
            classification: classify(path),
            loc_changed,
        }
    }
}

/// Risk multiplier per tier. Critical is unbudgetable: it is blocked
/// upstream and excluded from sums, never allowed to poison a total.
pub fn risk_multiplier(tier: RiskTier) -> f64 {
    match tier {
        RiskTier::Critical => f64::INFINITY,
        RiskTier::High => 3.0,
        RiskTier::Medium => 2.0,
        RiskTier::Low => 1.0,
    }
}

/// Weight of one file: `multiplier × (1 + loc × (multiplier + 1) / 160)`.
///
/// The LOC divisor scales with the tier (40 effective for high, 80 for low),
/// so a 20-line change weighs 4.5 on a high-risk file but only 1.25 on a
/// low-risk one. A file with no LOC estimate contributes its bare multiplier.
pub fn file_weight(tier: RiskTier, loc_changed: Option<u32>) -> f64 {
    let m = risk_multiplier(tier);
    let loc = f64::from(loc_changed.unwrap_or(0));
    m * (1.0 + loc * (m + 1.0) / 160.0)
}

/// Per-file weight entry for audit display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWeight {
    pub path: String,
    pub tier: RiskTier,
    pub loc_changed: u32,
    /// `None` for critical-tier files (blocked, never budgeted).
    pub weight: Option<f64>,
}

/// Sum of file weights, excluding critical-tier files.
pub fn calculate_weighted_impact(files: &[CandidateFile]) -> f64 {
    files
        .iter()
        .filter(|f| f.classification.tier != RiskTier::Critical)
        .map(|f| file_weight(f.classification.tier, f.loc_changed))
        .sum()
}

/// Outcome of budget validation. `violations` lists every independent
/// reason for rejection; `breakdown` enumerates each file's weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetDecision {
    pub allowed: bool,
    pub weighted_impact: f64,
    pub violations: Vec<String>,
    pub breakdown: Vec<FileWeight>,
}

/// Validate a candidate batch against the budget.
///
/// Pure function of its inputs: calling it twice with identical inputs
/// yields identical impact and violations. Empty batches are trivially
/// admitted.
pub fn validate_risk_weighted_budget(
    files: &[CandidateFile],
    recipe_count: usize,
    budget: &RiskBudget,
) -> BudgetDecision {
    let weighted_impact = calculate_weighted_impact(files);
    let total_loc: u64 = files
        .iter()
        .map(|f| u64::from(f.loc_changed.unwrap_or(0)))
        .sum();

    let breakdown = files
        .iter()
        .map(|f| FileWeight {
            path: f.classification.path.clone(),
            tier: f.classification.tier,
            loc_changed: f.loc_changed.unwrap_or(0),
            weight: (f.classification.tier != RiskTier::Critical)
                .then(|| file_weight(f.classification.tier, f.loc_changed)),
        })
        .collect();

    let mut violations = Vec::new();
    if weighted_impact > f64::from(budget.max_files) {
        violations.push(format!(
            "weighted impact {weighted_impact:.2} exceeds budget of {} files",
            budget.max_files
        ));
    }
    if total_loc > u64::from(budget.max_loc_changed) {
        violations.push(format!(
            "{total_loc} lines changed exceeds budget of {} lines",
            budget.max_loc_changed
        ));
    }
    if recipe_count > budget.max_recipes_per_session as usize {
        violations.push(format!(
            "{recipe_count} recipes exceeds budget of {} per session",
            budget.max_recipes_per_session
        ));
    }
    for f in files {
        if f.classification.tier == RiskTier::Critical {
            violations.push(format!(
                "{} is critical risk ({}) and requires manual review",
                f.classification.path, f.classification.category
            ));
        }
    }

    BudgetDecision {
        allowed: violations.is_empty(),
        weighted_impact,
        violations,
        breakdown,
    }
}
