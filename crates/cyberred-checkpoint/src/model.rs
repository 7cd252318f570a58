//! On-disk record shapes cascaded under an engagement's checkpoint.
//!
//! `AgentSnapshot.capabilities` is a `BTreeSet` rather than a `HashSet` so
//! serialization order is stable without a separate sort step — the
//! "set (sorted list)" case of spec.md §4.I's custom JSON encoder.
//! `AuditEntry.evidence` carries raw bytes hex-encoded via [`hex_bytes`] —
//! the "bytes (hex)" case.

use std::collections::BTreeSet;

use cyberred_core::{Engagement, Finding};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CheckpointError;

pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        serializer.serialize_str(&hex)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let hex = String::deserialize(deserializer)?;
        if hex.len() % 2 != 0 {
            return Err(serde::de::Error::custom("odd-length hex string"));
        }
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: String,
    pub engagement_id: String,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    /// Opaque agent state (recent actions, working memory). May contain a
    /// legacy `decision_context` encoded as a JSON string instead of an
    /// array on entries ported from an older checkpoint format; normalized
    /// back to an array on load via [`normalize_legacy_decision_context`].
    pub state: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub engagement_id: String,
    pub timestamp: String,
    pub action: String,
    pub triggered_by: String,
    pub details: Value,
    #[serde(with = "hex_bytes", default)]
    pub evidence: Vec<u8>,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointSnapshot {
    pub engagement: Engagement,
    pub agents: Vec<AgentSnapshot>,
    pub findings: Vec<Finding>,
    pub audit: Vec<AuditEntry>,
}

/// Recursively rewrites any object with a string-typed `decision_context`
/// field back into a parsed JSON array, matching `checkpoint.py`'s legacy
/// migration (cited in spec.md §4.I). Malformed legacy strings are left
/// untouched rather than failing the whole load.
pub fn normalize_legacy_decision_context(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(raw)) = map.get("decision_context") {
                if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
                    if parsed.is_array() {
                        map.insert("decision_context".to_string(), parsed);
                    }
                }
            }
            for v in map.values_mut() {
                normalize_legacy_decision_context(v);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                normalize_legacy_decision_context(item);
            }
        }
        _ => {}
    }
}

pub fn finding_from_row(data: &str) -> Result<Finding, CheckpointError> {
    Ok(serde_json::from_str(data)?)
}

pub fn agent_from_row(data: &str) -> Result<AgentSnapshot, CheckpointError> {
    let mut value: Value = serde_json::from_str(data)?;
    normalize_legacy_decision_context(&mut value);
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hex_bytes_round_trip() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper(#[serde(with = "hex_bytes")] Vec<u8>);
        let w = Wrapper(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, "\"deadbeef\"");
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.0, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn capabilities_serialize_sorted() {
        let snapshot = AgentSnapshot {
            id: "a1".into(),
            engagement_id: "e1".into(),
            capabilities: BTreeSet::from(["zscan".to_string(), "ascan".to_string()]),
            state: json!({}),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let ascan_pos = json.find("ascan").unwrap();
        let zscan_pos = json.find("zscan").unwrap();
        assert!(ascan_pos < zscan_pos);
    }

    #[test]
    fn normalizes_legacy_decision_context_string() {
        let mut value = json!({
            "recent_actions": [
                {"id": "a1", "decision_context": "[\"f1\",\"f2\"]"}
            ]
        });
        normalize_legacy_decision_context(&mut value);
        assert_eq!(
            value["recent_actions"][0]["decision_context"],
            json!(["f1", "f2"])
        );
    }

    #[test]
    fn leaves_already_array_decision_context_untouched() {
        let mut value = json!({"decision_context": ["f1"]});
        normalize_legacy_decision_context(&mut value);
        assert_eq!(value["decision_context"], json!(["f1"]));
    }
}
