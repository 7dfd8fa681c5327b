use mend_core::Finding;
use mend_risk::CandidateFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A proposed mutation: one recipe aimed at a set of classified files.
/// Produced before execution and used only for admission decisions.
///
/// Every target file carries a computed risk tier; a critical tier makes
/// the whole candidate inadmissible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationCandidate {
    pub recipe_id: String,
    pub target_files: Vec<CandidateFile>,
    pub issues: Vec<Finding>,
    pub estimated_loc_changed: u32,
    pub estimated_files_affected: u32,
    /// External ML confidence input, consumed as an opaque number.
    #[serde(default)]
    pub risk_reduction_estimate: f64,
}

impl MutationCandidate {
    /// Build a candidate from detector findings, classifying each distinct
    /// file and splitting the LOC estimate evenly across them.
    pub fn from_findings(
        recipe_id: &str,
        issues: Vec<Finding>,
        estimated_loc_changed: u32,
        risk_reduction_estimate: f64,
    ) -> Self {
        let mut per_file: BTreeMap<String, u32> = BTreeMap::new();
        for issue in &issues {
            *per_file.entry(issue.file.clone()).or_insert(0) += 1;
        }
        let file_count = per_file.len().max(1) as u32;
        let loc_per_file = estimated_loc_changed / file_count;
        let target_files = per_file
            .keys()
            .map(|path| CandidateFile::new(path, Some(loc_per_file)))
            .collect::<Vec<_>>();

        Self {
            recipe_id: recipe_id.to_string(),
            estimated_files_affected: target_files.len() as u32,
            target_files,
            issues,
            estimated_loc_changed,
            risk_reduction_estimate,
        }
    }

    /// Target paths in deterministic order.
    pub fn paths(&self) -> Vec<String> {
        self.target_files
            .iter()
            .map(|f| f.classification.path.clone())
            .collect()
    }

    /// Findings aimed at one path.
    pub fn issues_for(&self, path: &str) -> Vec<&Finding> {
        self.issues.iter().filter(|i| i.file == path).collect()
    }
}
