//! Agent action records.
//!
//! `decision_context` carries the IDs of stigmergic signals that influenced
//! the action; the Session Manager enforces it non-empty for stigmergic
//! actions at the call site rather than in this type, so plain unit tests
//! can still construct bare actions (see DESIGN.md data-model notes).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::validate::{validate_target, validate_timestamp, validate_uuid};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    pub id: String,
    pub agent_id: String,
    pub action_type: String,
    pub target: String,
    pub timestamp: String,
    #[serde(default)]
    pub decision_context: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_finding_id: Option<String>,
}

impl AgentAction {
    pub fn new(
        id: String,
        agent_id: String,
        action_type: String,
        target: String,
        timestamp: String,
        decision_context: Vec<String>,
        result_finding_id: Option<String>,
    ) -> Result<Self> {
        let action = Self {
            id,
            agent_id,
            action_type,
            target,
            timestamp,
            decision_context,
            result_finding_id,
        };
        action.validate()?;
        Ok(action)
    }

    fn validate(&self) -> Result<()> {
        validate_uuid(&self.id, "id")?;
        validate_uuid(&self.agent_id, "agent_id")?;
        validate_timestamp(&self.timestamp, "timestamp")?;
        validate_target(&self.target, "target")?;
        if let Some(ref finding_id) = self.result_finding_id {
            validate_uuid(finding_id, "result_finding_id")?;
        }
        Ok(())
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let action: Self = serde_json::from_str(data)?;
        action.validate()?;
        Ok(action)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_decision_context_to_empty() {
        let action = AgentAction::new(
            "f47ac10b-58cc-4372-a567-0e02b2c3d479".into(),
            "6b9a6e3e-6b2f-4e1e-9a2e-0b1c2d3e4f5a".into(),
            "scan".into(),
            "192.168.1.100".into(),
            "2025-12-27T23:30:00Z".into(),
            Vec::new(),
            None,
        )
        .unwrap();
        assert!(action.decision_context.is_empty());
        assert!(action.result_finding_id.is_none());
    }

    #[test]
    fn deserializes_without_result_finding_id() {
        let json = r#"{
            "id": "f47ac10b-58cc-4372-a567-0e02b2c3d479",
            "agent_id": "6b9a6e3e-6b2f-4e1e-9a2e-0b1c2d3e4f5a",
            "action_type": "enumerate",
            "target": "example.com",
            "timestamp": "2025-12-27T23:30:00Z"
        }"#;
        let action = AgentAction::from_json(json).unwrap();
        assert_eq!(action.decision_context, Vec::<String>::new());
    }

    #[test]
    fn rejects_invalid_result_finding_id() {
        let action = AgentAction::new(
            "f47ac10b-58cc-4372-a567-0e02b2c3d479".into(),
            "6b9a6e3e-6b2f-4e1e-9a2e-0b1c2d3e4f5a".into(),
            "scan".into(),
            "192.168.1.100".into(),
            "2025-12-27T23:30:00Z".into(),
            Vec::new(),
            Some("not-a-uuid".into()),
        );
        assert!(action.is_err());
    }
}
