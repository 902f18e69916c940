//! Checksums of embedded migration sources

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a migration's source text.
pub fn calculate_checksum(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
