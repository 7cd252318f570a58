//! Content-hash cache memoizing Tier-2 LLM distillation results.
//!
//! Keyed on `tool + SHA-256(stdout + stderr)` truncated to 16 hex chars,
//! per spec.md §4.G, so re-running the same failing command against the
//! same target doesn't re-pay an LLM call.

use std::collections::HashMap;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::types::RawFinding;

#[derive(Clone)]
struct Entry {
    findings: Vec<RawFinding>,
    summary: String,
}

#[derive(Default)]
pub struct Tier2Cache {
    inner: RwLock<HashMap<String, Entry>>,
}

impl Tier2Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(tool: &str, stdout: &str, stderr: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(stdout.as_bytes());
        hasher.update(stderr.as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        format!("{tool}:{}", &hex[..16])
    }

    pub fn get(&self, key: &str) -> Option<(Vec<RawFinding>, String)> {
        self.inner
            .read()
            .get(key)
            .map(|entry| (entry.findings.clone(), entry.summary.clone()))
    }

    pub fn put(&self, key: String, findings: Vec<RawFinding>, summary: String) {
        self.inner.write().insert(key, Entry { findings, summary });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_content_hashes_to_same_key() {
        let a = Tier2Cache::key("nmap", "out", "err");
        let b = Tier2Cache::key("nmap", "out", "err");
        assert_eq!(a, b);
    }

    #[test]
    fn different_tool_changes_key_even_with_same_content() {
        let a = Tier2Cache::key("nmap", "out", "err");
        let b = Tier2Cache::key("sqlmap", "out", "err");
        assert_ne!(a, b);
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = Tier2Cache::new();
        let key = Tier2Cache::key("nmap", "out", "err");
        cache.put(
            key.clone(),
            vec![RawFinding {
                finding_type: "open_port".into(),
                severity: "info".into(),
                description: "22/tcp".into(),
                evidence: "22/tcp open".into(),
            }],
            "1 port".into(),
        );
        let (findings, summary) = cache.get(&key).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(summary, "1 port");
    }
}
