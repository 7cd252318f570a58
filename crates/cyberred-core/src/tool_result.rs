//! Tool execution results.
//!
//! Used for expected/tool errors (`success: false`); critical/system errors
//! propagate as `CyberRedError` instead.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorType {
    Timeout,
    NonZeroExit,
    ContainerCrashed,
    ExecutionException,
    PoolExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ToolErrorType>,
}

impl ToolResult {
    pub fn success(stdout: String, stderr: String, exit_code: i32, duration_ms: u64) -> Self {
        Self {
            success: true,
            stdout,
            stderr,
            exit_code,
            duration_ms,
            error_type: None,
        }
    }

    pub fn failure(
        stdout: String,
        stderr: String,
        exit_code: i32,
        duration_ms: u64,
        error_type: ToolErrorType,
    ) -> Self {
        Self {
            success: false,
            stdout,
            stderr,
            exit_code,
            duration_ms,
            error_type: Some(error_type),
        }
    }

    /// Deserialize from JSON, tolerating payloads written before
    /// `error_type` existed (treated as `None`, matching the Python
    /// original's backwards-compatibility handling).
    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_legacy_payload_without_error_type() {
        let json = r#"{"success":true,"stdout":"ok","stderr":"","exit_code":0,"duration_ms":120}"#;
        let result = ToolResult::from_json(json).unwrap();
        assert_eq!(result.error_type, None);
    }

    #[test]
    fn serializes_error_type_as_screaming_snake_case() {
        let result = ToolResult::failure(
            String::new(),
            "boom".into(),
            1,
            50,
            ToolErrorType::ContainerCrashed,
        );
        let json = result.to_json().unwrap();
        assert!(json.contains("\"CONTAINER_CRASHED\""));
    }
}
