//! Stigmergic topic naming for intelligence sharing.
//!
//! Grounded on `original_source/src/cyberred/intelligence/stigmergic.py`:
//! topic format `findings:{target_hash}:intel_enriched` where
//! `target_hash = SHA256(service:version)[:8]`.

use sha2::{Digest, Sha256};

pub const STIGMERGIC_TTL_SECS: u64 = 300;

pub fn intel_topic(service: &str, version: &str) -> String {
    let key = format!("{}:{}", service.to_lowercase(), version.to_lowercase());
    let digest = Sha256::digest(key.as_bytes());
    let hash8 = hex_prefix(&digest, 8);
    format!("findings:{hash8}:intel_enriched")
}

/// Routing channel for a finding: `findings:<target_hash8>:<type>` per
/// spec.md §3.
pub fn finding_topic(target: &str, finding_type: &str) -> String {
    let digest = Sha256::digest(target.as_bytes());
    let hash8 = hex_prefix(&digest, 8);
    format!("findings:{hash8}:{finding_type}")
}

fn hex_prefix(bytes: &[u8], chars: usize) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
        .chars()
        .take(chars)
        .collect()
}
