//! Vulnerability finding records.
//!
//! All stigmergic messages use this flat JSON shape. `signature` carries an
//! HMAC-SHA256 over the canonical payload, computed by the caller via
//! `cyberred-time`'s timestamp signing and checked at the bus boundary to
//! mitigate agent-in-the-middle tampering.

use serde::{Deserialize, Serialize};

use crate::error::{CyberRedError, Result};
use crate::validate::{validate_severity, validate_target, validate_timestamp, validate_uuid};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    #[serde(rename = "type")]
    pub finding_type: String,
    pub severity: String,
    pub target: String,
    pub evidence: String,
    pub agent_id: String,
    pub timestamp: String,
    pub tool: String,
    pub topic: String,
    pub signature: String,
}

impl Finding {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        finding_type: String,
        severity: String,
        target: String,
        evidence: String,
        agent_id: String,
        timestamp: String,
        tool: String,
        topic: String,
        signature: String,
    ) -> Result<Self> {
        let finding = Self {
            id,
            finding_type,
            severity,
            target,
            evidence,
            agent_id,
            timestamp,
            tool,
            topic,
            signature,
        };
        finding.validate()?;
        Ok(finding)
    }

    fn validate(&self) -> Result<()> {
        validate_severity(&self.severity)?;
        validate_uuid(&self.id, "id")?;
        validate_uuid(&self.agent_id, "agent_id")?;
        validate_timestamp(&self.timestamp, "timestamp")?;
        validate_target(&self.target, "target")?;
        Ok(())
    }

    /// Canonical JSON for HMAC signing. Field order is fixed by construction
    /// order above (`serde_json` with the `preserve_order` feature preserves
    /// struct field order), so the signature is deterministic across
    /// processes and rebuilds.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let finding: Self = serde_json::from_str(data)?;
        finding.validate()?;
        Ok(finding)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl TryFrom<serde_json::Value> for Finding {
    type Error = CyberRedError;

    fn try_from(value: serde_json::Value) -> std::result::Result<Self, Self::Error> {
        let finding: Self = serde_json::from_value(value)?;
        finding.validate()?;
        Ok(finding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Finding {
        Finding::new(
            "f47ac10b-58cc-4372-a567-0e02b2c3d479".into(),
            "sqli".into(),
            "critical".into(),
            "192.168.1.100".into(),
            "Vulnerable parameter `id`".into(),
            "6b9a6e3e-6b2f-4e1e-9a2e-0b1c2d3e4f5a".into(),
            "2025-12-27T23:30:00Z".into(),
            "sqlmap".into(),
            "findings:a1b2c3:sqli".into(),
            "hmac-sig".into(),
        )
        .expect("valid finding")
    }

    #[test]
    fn roundtrips_through_json() {
        let finding = sample();
        let json = finding.to_json().unwrap();
        let decoded = Finding::from_json(&json).unwrap();
        assert_eq!(finding, decoded);
    }

    #[test]
    fn rejects_invalid_severity() {
        let err = Finding::new(
            "f47ac10b-58cc-4372-a567-0e02b2c3d479".into(),
            "sqli".into(),
            "catastrophic".into(),
            "192.168.1.100".into(),
            "evidence".into(),
            "6b9a6e3e-6b2f-4e1e-9a2e-0b1c2d3e4f5a".into(),
            "2025-12-27T23:30:00Z".into(),
            "sqlmap".into(),
            "findings:a1b2c3:sqli".into(),
            "hmac-sig".into(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn canonical_json_is_stable() {
        let finding = sample();
        let a = finding.to_canonical_json().unwrap();
        let b = finding.to_canonical_json().unwrap();
        assert_eq!(a, b);
    }
}
