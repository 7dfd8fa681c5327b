use sha2::{Digest, Sha256};

/// Compute SHA-256 of bytes, returning lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash a before/after content pair as one digest (attestation input:
/// SHA-256 over the concatenated contents).
pub fn sha256_concat_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}
