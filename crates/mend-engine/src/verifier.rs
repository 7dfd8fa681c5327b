//! Post-mutation verification: re-run the detectors that originated the
//! issues, scoped to the modified files, and compare issue counts.
//!
//! Fails closed: if re-analysis itself errors, the mutation is treated as
//! not improved so the orchestrator rolls it back. A silent false negative
//! here would let regressions through, which this design forbids.

use crate::traits::Detector;
use mend_core::Finding;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub before_issue_count: usize,
    pub after_issue_count: usize,
    pub improved: bool,
    pub new_issues_introduced: usize,
}

/// Re-analyze `files` with the detectors named on the original findings.
pub fn revalidate(
    detectors: &[&dyn Detector],
    root: &Path,
    files: &[String],
    before: &[Finding],
) -> VerificationResult {
    let before_issue_count = before.len();
    let named: HashSet<&str> = before.iter().map(|f| f.detector.as_str()).collect();

    let mut after: Vec<Finding> = Vec::new();
    for detector in detectors {
        if !named.contains(detector.id()) {
            continue;
        }
        for file in files {
            match detector.analyze(&root.join(file)) {
                Ok(findings) => after.extend(findings),
                Err(e) => {
                    warn!(detector = detector.id(), file = %file, error = %e,
                        "re-analysis failed, treating mutation as not improved");
                    return VerificationResult {
                        before_issue_count,
                        after_issue_count: before_issue_count,
                        improved: false,
                        new_issues_introduced: 0,
                    };
                }
            }
        }
    }

    let before_keys: HashSet<(String, String)> = before.iter().map(|f| f.key()).collect();
    let new_issues_introduced = after
        .iter()
        .filter(|f| !before_keys.contains(&f.key()))
        .count();

    VerificationResult {
        before_issue_count,
        after_issue_count: after.len(),
        improved: after.len() < before_issue_count,
        new_issues_introduced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mend_core::Severity;

    /// Counts occurrences of a marker string per file.
    struct MarkerDetector {
        id: &'static str,
        marker: &'static str,
    }

    impl Detector for MarkerDetector {
        fn id(&self) -> &str {
            self.id
        }
        fn analyze(&self, path: &Path) -> anyhow::Result<Vec<Finding>> {
            let content = std::fs::read_to_string(path).unwrap_or_default();
            let rel = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            Ok(content
                .lines()
                .enumerate()
                .filter(|(_, l)| l.contains(self.marker))
                .map(|(i, _)| Finding {
                    file: rel.clone(),
                    line: i as u32 + 1,
                    message: format!("{} found at line {}", self.marker, i + 1),
                    severity: Severity::Warning,
                    category: "lint".to_string(),
                    detector: self.id.to_string(),
                })
                .collect())
        }
    }

    struct BrokenDetector;

    impl Detector for BrokenDetector {
        fn id(&self) -> &str {
            "broken"
        }
        fn analyze(&self, _path: &Path) -> anyhow::Result<Vec<Finding>> {
            anyhow::bail!("analyzer crashed")
        }
    }

    fn finding(detector: &str, file: &str, message: &str) -> Finding {
        Finding {
            file: file.to_string(),
            line: 1,
            message: message.to_string(),
            severity: Severity::Warning,
            category: "lint".to_string(),
            detector: detector.to_string(),
        }
    }

    #[test]
    fn fewer_issues_is_improved() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.ts"), "clean\nclean\n").unwrap();
        let detector = MarkerDetector {
            id: "fixme-check",
            marker: "FIXME",
        };
        let before = vec![
            finding("fixme-check", "a.ts", "FIXME found at line 1"),
            finding("fixme-check", "a.ts", "FIXME found at line 2"),
        ];

        let result = revalidate(
            &[&detector],
            tmp.path(),
            &["a.ts".to_string()],
            &before,
        );
        assert_eq!(result.before_issue_count, 2);
        assert_eq!(result.after_issue_count, 0);
        assert!(result.improved);
        assert_eq!(result.new_issues_introduced, 0);
    }

    #[test]
    fn equal_count_is_not_improved() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.ts"), "FIXME still here\n").unwrap();
        let detector = MarkerDetector {
            id: "fixme-check",
            marker: "FIXME",
        };
        let before = vec![finding("fixme-check", "a.ts", "FIXME found at line 1")];

        let result = revalidate(&[&detector], tmp.path(), &["a.ts".to_string()], &before);
        assert_eq!(result.after_issue_count, 1);
        assert!(!result.improved);
    }

    #[test]
    fn new_issues_are_counted() {
        let tmp = tempfile::tempdir().unwrap();
        // the mutation "fixed" line 1 but introduced two new markers below
        std::fs::write(tmp.path().join("a.ts"), "ok\nFIXME new one\nFIXME another\n").unwrap();
        let detector = MarkerDetector {
            id: "fixme-check",
            marker: "FIXME",
        };
        let before = vec![finding("fixme-check", "a.ts", "FIXME found at line 1")];

        let result = revalidate(&[&detector], tmp.path(), &["a.ts".to_string()], &before);
        assert_eq!(result.new_issues_introduced, 2);
        assert!(!result.improved);
    }

    #[test]
    fn detector_error_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let detector = BrokenDetector;
        let before = vec![finding("broken", "a.ts", "whatever")];

        let result = revalidate(&[&detector], tmp.path(), &["a.ts".to_string()], &before);
        assert!(!result.improved);
        assert_eq!(result.after_issue_count, result.before_issue_count);
    }

    #[test]
    fn unrelated_detectors_are_not_run() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.ts"), "TODO everywhere\n").unwrap();
        let fixme = MarkerDetector {
            id: "fixme-check",
            marker: "FIXME",
        };
        let todo = MarkerDetector {
            id: "todo-check",
            marker: "TODO",
        };
        // original issues came only from fixme-check; todo-check findings
        // must not pollute the after count
        let before = vec![finding("fixme-check", "a.ts", "FIXME found at line 1")];

        let result = revalidate(&[&fixme, &todo], tmp.path(), &["a.ts".to_string()], &before);
        assert_eq!(result.after_issue_count, 0);
        assert!(result.improved);
    }
}
