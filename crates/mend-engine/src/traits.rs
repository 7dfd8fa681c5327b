use mend_core::Finding;
use std::path::Path;

/// External static analyzer. The engine never looks inside one; it only
/// asks for findings, both to originate candidates and to re-check files
/// after a mutation.
pub trait Detector {
    fn id(&self) -> &str;

    /// Analyze one file and return its findings.
    fn analyze(&self, path: &Path) -> anyhow::Result<Vec<Finding>>;
}

/// An automated fix from the recipe catalog: an opaque transformation from
/// `(file content, issue)` to new file content. The engine only calls
/// `apply` and measures the resulting diff.
pub trait Recipe {
    fn id(&self) -> &str;

    /// Human-readable name, defaults to the id.
    fn name(&self) -> &str {
        self.id()
    }

    /// Whether this recipe can address the given issue.
    fn matches(&self, issue: &Finding) -> bool;

    /// Transform file content to fix the issue. Must return the complete
    /// new content; the engine trusts it to be syntactically valid.
    fn apply(&self, content: &str, issue: &Finding) -> anyhow::Result<String>;
}
