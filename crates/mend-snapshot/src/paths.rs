use std::path::{Path, PathBuf};

/// All well-known paths under `.mend/`.
#[derive(Debug, Clone)]
pub struct MendPaths {
    pub root: PathBuf,
    pub mend_dir: PathBuf,
    pub snapshots_dir: PathBuf,
    pub payloads_dir: PathBuf,
    pub index_json: PathBuf,
    pub attest_jsonl: PathBuf,
    pub config_json: PathBuf,
    pub policy_yaml: PathBuf,
    pub lock_file: PathBuf,
}

impl MendPaths {
    /// Derive all paths from a repo root. Pure computation, no I/O.
    pub fn discover(repo_root: impl Into<PathBuf>) -> Self {
        let root = repo_root.into();
        let mend_dir = root.join(".mend");
        let snapshots_dir = mend_dir.join("snapshots");
        Self {
            payloads_dir: snapshots_dir.join("payloads"),
            index_json: snapshots_dir.join("index.json"),
            attest_jsonl: mend_dir.join("attest.jsonl"),
            config_json: mend_dir.join("config.json"),
            policy_yaml: mend_dir.join("policy.yaml"),
            lock_file: mend_dir.join("LOCK"),
            snapshots_dir,
            mend_dir,
            root,
        }
    }

    /// Create all required directories. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        for dir in [&self.mend_dir, &self.snapshots_dir, &self.payloads_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Check whether `.mend/` exists.
    pub fn is_initialized(&self) -> bool {
        self.mend_dir.is_dir()
    }

    /// Directory holding one snapshot's compressed payloads.
    pub fn payload_dir(&self, snapshot_id: &str) -> PathBuf {
        self.payloads_dir.join(snapshot_id)
    }

    /// Walk up from `start` looking for a directory containing `.mend/`.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(".mend").is_dir() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }
}
