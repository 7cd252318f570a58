//! Vulnerability intelligence data shapes shared between `cyberred-intel`
//! and the LLM gateway.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Lower values are more authoritative. Ordering grounds
/// `original_source/src/cyberred/intelligence/base.py`'s priority constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum IntelPriority {
    Kev = 1,
    CriticalCve = 2,
    HighCve = 3,
    Metasploit = 4,
    Nuclei = 5,
    Exploitdb = 6,
    MediumCve = 7,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelResult {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cve_id: Option<String>,
    pub severity: String,
    pub exploit_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exploit_path: Option<String>,
    pub confidence: f64,
    pub priority: IntelPriority,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl IntelResult {
    pub fn confidence_in_range(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence)
    }
}

impl PartialOrd for IntelResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for IntelResult {}

impl Ord for IntelResult {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StigmergicMessage {
    pub payload: serde_json::Value,
    pub signature: String,
    pub timestamp: String,
    pub engagement_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferedMessage {
    pub channel: String,
    pub message: serde_json::Value,
    pub enqueued_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_sorts_ascending() {
        let mut priorities = vec![
            IntelPriority::Nuclei,
            IntelPriority::Kev,
            IntelPriority::MediumCve,
            IntelPriority::CriticalCve,
        ];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![
                IntelPriority::Kev,
                IntelPriority::CriticalCve,
                IntelPriority::Nuclei,
                IntelPriority::MediumCve,
            ]
        );
    }

    #[test]
    fn kev_outranks_everything() {
        assert!(IntelPriority::Kev < IntelPriority::CriticalCve);
        assert!(IntelPriority::CriticalCve < IntelPriority::Metasploit);
    }
}
