//! Execution-time guardrails, re-checked immediately before disk writes.
//!
//! Protected-path globs are compiled into one `GlobSet` when the
//! constraints are built and reused for every candidate file, never
//! recompiled per call.

use globset::{Glob, GlobSet, GlobSetBuilder};
use mend_core::FileCategory;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PROTECTED_PATHS: &[&str] = &[
    "**/.env*",
    "**/secrets/**",
    "**/*.pem",
    "**/*.key",
    "**/migrations/**",
    ".git/**",
    ".mend/**",
];

/// Operator-editable policy file (`.mend/policy.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyFile {
    #[serde(default)]
    pub max_loc: Option<u32>,
    #[serde(default)]
    pub max_files: Option<usize>,
    #[serde(default)]
    pub protected_paths: Vec<String>,
    #[serde(default)]
    pub allowed_categories: Vec<FileCategory>,
}

/// Per-recipe execution constraints with the compiled protected-path set.
pub struct ExecutionConstraints {
    pub max_loc: u32,
    pub max_files: usize,
    pub protected_paths: Vec<String>,
    /// Empty list = every category allowed.
    pub allowed_categories: Vec<FileCategory>,
    protected: GlobSet,
}

impl ExecutionConstraints {
    pub fn new(
        max_loc: u32,
        max_files: usize,
        protected_paths: Vec<String>,
        allowed_categories: Vec<FileCategory>,
    ) -> anyhow::Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &protected_paths {
            builder.add(
                Glob::new(pattern)
                    .map_err(|e| anyhow::anyhow!("invalid protected path {pattern}: {e}"))?,
            );
        }
        Ok(Self {
            max_loc,
            max_files,
            protected_paths,
            allowed_categories,
            protected: builder.build()?,
        })
    }

    /// Defaults: generous LOC/file bounds, the built-in protected set,
    /// every category allowed.
    pub fn defaults() -> Self {
        Self::new(
            1_000,
            50,
            DEFAULT_PROTECTED_PATHS.iter().map(|s| s.to_string()).collect(),
            Vec::new(),
        )
        .expect("built-in protected paths are valid globs")
    }

    /// Load from `.mend/policy.yaml`; a missing file yields the defaults.
    pub fn load(policy_yaml: &Path) -> anyhow::Result<Self> {
        if !policy_yaml.exists() {
            return Ok(Self::defaults());
        }
        let content = std::fs::read_to_string(policy_yaml)?;
        let policy: PolicyFile = serde_yaml::from_str(&content)?;
        let protected = if policy.protected_paths.is_empty() {
            DEFAULT_PROTECTED_PATHS.iter().map(|s| s.to_string()).collect()
        } else {
            policy.protected_paths
        };
        Self::new(
            policy.max_loc.unwrap_or(1_000),
            policy.max_files.unwrap_or(50),
            protected,
            policy.allowed_categories,
        )
    }

    /// Whether a path matches any protected pattern. Separators are
    /// normalized and the bare file name is also tried, so `**/.env*`
    /// catches `.env` at the repo root too.
    pub fn is_protected(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");
        if self.protected.is_match(&normalized) {
            return true;
        }
        let file_name = Path::new(&normalized)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");
        self.protected.is_match(file_name)
    }

    pub fn category_allowed(&self, category: FileCategory) -> bool {
        self.allowed_categories.is_empty() || self.allowed_categories.contains(&category)
    }

    /// Default policy YAML written by `mend init`.
    pub fn default_policy_yaml() -> String {
        let mut out = String::from("max_loc: 1000\nmax_files: 50\nprotected_paths:\n");
        for pattern in DEFAULT_PROTECTED_PATHS {
            out.push_str(&format!("  - \"{pattern}\"\n"));
        }
        out.push_str("# allowed_categories: [source, test, documentation, config]\n");
        out
    }
}
