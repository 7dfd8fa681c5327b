//! Per-session state machine. Each recipe walks
//! `Validating → Executing → Verifying → {Committed | RolledBack | Failed}`
//! (with `Skipped` as the admission off-ramp and a direct
//! `Executing → Committed` edge for low-risk rewrite-strategy recipes),
//! and the stop-on-regression rule is enforced on the machine itself so it
//! is testable without touching disk.

use crate::executor::RecipeStatus;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecipeStage {
    Validating,
    Executing,
    Verifying,
    Committed,
    RolledBack,
    Failed,
    Skipped,
}

/// Aggregated outcome of one session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SessionOutcome {
    Success,
    Partial,
    Failed,
    RolledBack,
}

impl std::fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionOutcome::Success => write!(f, "success"),
            SessionOutcome::Partial => write!(f, "partial"),
            SessionOutcome::Failed => write!(f, "failed"),
            SessionOutcome::RolledBack => write!(f, "rolled-back"),
        }
    }
}

// ── Valid transitions ──

const VALID_TRANSITIONS: &[(RecipeStage, &[RecipeStage])] = &[
    (
        RecipeStage::Validating,
        &[RecipeStage::Executing, RecipeStage::Skipped],
    ),
    (
        RecipeStage::Executing,
        &[
            RecipeStage::Verifying,
            // rewrite strategy commits without mandatory re-verification
            RecipeStage::Committed,
            RecipeStage::Failed,
        ],
    ),
    (
        RecipeStage::Verifying,
        &[RecipeStage::Committed, RecipeStage::RolledBack],
    ),
    // Committed, RolledBack, Failed, Skipped are terminal
];

fn is_valid_transition(from: RecipeStage, to: RecipeStage) -> bool {
    VALID_TRANSITIONS
        .iter()
        .any(|(f, targets)| *f == from && targets.contains(&to))
}

/// Tracks one recipe through the machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeState {
    pub recipe_id: String,
    pub stage: RecipeStage,
}

impl RecipeState {
    pub fn new(recipe_id: &str) -> Self {
        Self {
            recipe_id: recipe_id.to_string(),
            stage: RecipeStage::Validating,
        }
    }

    /// Advance to `to`, rejecting transitions the table does not allow.
    pub fn transition(&mut self, to: RecipeStage) -> Result<()> {
        if !is_valid_transition(self.stage, to) {
            bail!(
                "invalid transition for {}: {:?} → {:?}",
                self.recipe_id,
                self.stage,
                to
            );
        }
        self.stage = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.stage,
            RecipeStage::Committed
                | RecipeStage::RolledBack
                | RecipeStage::Failed
                | RecipeStage::Skipped
        )
    }

    /// A failed or rolled-back recipe halts the session; later recipes must
    /// not run against an already-regressed tree.
    pub fn halts_session(&self) -> bool {
        matches!(self.stage, RecipeStage::Failed | RecipeStage::RolledBack)
    }
}

/// Derive the session outcome from per-recipe statuses.
///
/// Admission-skipped recipes were never attempted and do not count; a
/// session whose every recipe was skipped closes as `success` (nothing was
/// touched, nothing regressed).
pub fn aggregate_outcome(statuses: &[RecipeStatus]) -> SessionOutcome {
    let executed = statuses
        .iter()
        .filter(|s| **s == RecipeStatus::Executed)
        .count();
    let rolled_back = statuses
        .iter()
        .filter(|s| **s == RecipeStatus::RolledBack)
        .count();
    let failed = statuses
        .iter()
        .filter(|s| **s == RecipeStatus::Failed)
        .count();

    if rolled_back == 0 && failed == 0 {
        SessionOutcome::Success
    } else if executed == 0 && rolled_back > 0 {
        SessionOutcome::RolledBack
    } else if executed > 0 {
        SessionOutcome::Partial
    } else {
        SessionOutcome::Failed
    }
}
