//! Tamper-evident audit trail: one JSON line per attempted mutation,
//! hash-chained so external compliance tooling can prove no entry was
//! edited, reordered, or dropped. The engine only ever appends; it never
//! rewrites or truncates this file.

use mend_core::hash::{sha256_concat_hex, sha256_hex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// One attestation record. Permanent once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationEntry {
    pub ts: String,
    pub session_id: String,
    pub recipe_id: String,
    pub files_modified: Vec<String>,
    /// SHA-256 over the concatenated pre-mutation contents.
    pub before_hash: String,
    /// SHA-256 over the concatenated post-mutation contents.
    pub after_hash: String,
    pub improved: bool,
    /// Hash of the previous entry; `None` for the first entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_hash: Option<String>,
    /// Canonical-JSON hash of this entry (computed with `hash` absent).
    pub hash: String,
}

/// Append-only log backed by `.mend/attest.jsonl`.
pub struct AttestationLog {
    path: PathBuf,
}

impl AttestationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append an entry for one attempted mutation (committed or rolled
    /// back). Computes content hashes and chains onto the previous entry.
    pub fn attest(
        &self,
        session_id: &str,
        recipe_id: &str,
        files_modified: &[String],
        before_content: &[Vec<u8>],
        after_content: &[Vec<u8>],
        improved: bool,
    ) -> anyhow::Result<AttestationEntry> {
        let before: Vec<&[u8]> = before_content.iter().map(|c| c.as_slice()).collect();
        let after: Vec<&[u8]> = after_content.iter().map(|c| c.as_slice()).collect();

        let mut entry = AttestationEntry {
            ts: now_rfc3339()?,
            session_id: session_id.to_string(),
            recipe_id: recipe_id.to_string(),
            files_modified: files_modified.to_vec(),
            before_hash: sha256_concat_hex(&before),
            after_hash: sha256_concat_hex(&after),
            improved,
            parent_hash: self.last_hash()?,
            hash: String::new(),
        };
        entry.hash = entry_hash(&entry)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        file.sync_all()?;
        Ok(entry)
    }

    /// Structural integrity check over the whole chain. An absent log is
    /// valid (empty). Returns `false` on any recomputed-hash mismatch,
    /// broken parent link, or unparseable line.
    pub fn verify(&self) -> anyhow::Result<bool> {
        if !self.path.exists() {
            return Ok(true);
        }
        let file = std::fs::File::open(&self.path)?;
        let reader = std::io::BufReader::new(file);
        let mut previous_hash: Option<String> = None;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AttestationEntry = match serde_json::from_str(&line) {
                Ok(e) => e,
                Err(e) => {
                    warn!(line = lineno + 1, error = %e, "attestation entry unparseable");
                    return Ok(false);
                }
            };
            if entry.parent_hash != previous_hash {
                warn!(line = lineno + 1, "attestation chain link broken");
                return Ok(false);
            }
            if entry_hash(&entry)? != entry.hash {
                warn!(line = lineno + 1, "attestation entry hash mismatch");
                return Ok(false);
            }
            previous_hash = Some(entry.hash);
        }
        Ok(true)
    }

    /// All entries, oldest first. An absent log is an empty list.
    pub fn entries(&self) -> anyhow::Result<Vec<AttestationEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)?;
        let reader = std::io::BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    fn last_hash(&self) -> anyhow::Result<Option<String>> {
        Ok(self.entries()?.pop().map(|e| e.hash))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Hash an entry: serialize without the `hash` field, canonical key order,
/// SHA-256.
fn entry_hash(entry: &AttestationEntry) -> anyhow::Result<String> {
    let mut value = serde_json::to_value(entry)?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("hash");
    }
    Ok(sha256_hex(&canonical_bytes(&value)))
}

/// Canonical JSON bytes: object keys sorted lexicographically at every
/// depth, arrays in order, no extra whitespace.
fn canonical_bytes(value: &Value) -> Vec<u8> {
    fn sort(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut pairs: Vec<(&String, Value)> =
                    map.iter().map(|(k, v)| (k, sort(v))).collect();
                pairs.sort_by(|a, b| a.0.cmp(b.0));
                Value::Object(pairs.into_iter().map(|(k, v)| (k.clone(), v)).collect())
            }
            Value::Array(arr) => Value::Array(arr.iter().map(sort).collect()),
            other => other.clone(),
        }
    }
    serde_json::to_vec(&sort(value)).expect("canonical JSON serialization should not fail")
}

fn now_rfc3339() -> anyhow::Result<String> {
    Ok(time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)?)
}
