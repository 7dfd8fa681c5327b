use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_FILES: u32 = 10;
pub const DEFAULT_MAX_LOC_CHANGED: u32 = 300;
pub const DEFAULT_MAX_RECIPES_PER_SESSION: u32 = 5;

/// Per-session mutation budget. Supplied once at session start and never
/// mutated mid-session.
///
/// `max_files` bounds the risk-weighted impact (not a raw file count: a
/// high-risk file consumes several "file slots").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskBudget {
    pub max_files: u32,
    pub max_loc_changed: u32,
    pub max_recipes_per_session: u32,
}

impl Default for RiskBudget {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_loc_changed: DEFAULT_MAX_LOC_CHANGED,
            max_recipes_per_session: DEFAULT_MAX_RECIPES_PER_SESSION,
        }
    }
}

impl RiskBudget {
    /// Load the budget from a flat config map (`config.json`), falling back
    /// to defaults for any missing key. A missing file is a default budget.
    pub fn load(config_json: &Path) -> anyhow::Result<Self> {
        if !config_json.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(config_json)?;
        let map: serde_json::Value = serde_json::from_str(&content)?;
        let get = |key: &str, default: u32| -> u32 {
            map.get(key)
                .and_then(|v| v.as_u64())
                .map(|v| v as u32)
                .unwrap_or(default)
        };
        Ok(Self {
            max_files: get("budget.max_files", DEFAULT_MAX_FILES),
            max_loc_changed: get("budget.max_loc_changed", DEFAULT_MAX_LOC_CHANGED),
            max_recipes_per_session: get(
                "budget.max_recipes_per_session",
                DEFAULT_MAX_RECIPES_PER_SESSION,
            ),
        })
    }
}
