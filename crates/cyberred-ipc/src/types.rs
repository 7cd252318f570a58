//! Wire types for the request/response and streaming protocols, grounded on
//! spec.md §4.N. Unknown JSON fields on a request are ignored (`serde`'s
//! default behavior) rather than rejected, for forward compatibility with
//! newer clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed command set. `command` arrives on the wire as the dotted
/// string form (e.g. `"engagement.start"`); anything else is rejected by
/// [`Command::parse`] before it ever reaches a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SessionsList,
    EngagementStart,
    EngagementPause,
    EngagementResume,
    EngagementStop,
    EngagementAttach,
    EngagementDetach,
    DaemonStop,
    DaemonConfigReload,
}

impl Command {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "sessions.list" => Self::SessionsList,
            "engagement.start" => Self::EngagementStart,
            "engagement.pause" => Self::EngagementPause,
            "engagement.resume" => Self::EngagementResume,
            "engagement.stop" => Self::EngagementStop,
            "engagement.attach" => Self::EngagementAttach,
            "engagement.detach" => Self::EngagementDetach,
            "daemon.stop" => Self::DaemonStop,
            "daemon.config.reload" => Self::DaemonConfigReload,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionsList => "sessions.list",
            Self::EngagementStart => "engagement.start",
            Self::EngagementPause => "engagement.pause",
            Self::EngagementResume => "engagement.resume",
            Self::EngagementStop => "engagement.stop",
            Self::EngagementAttach => "engagement.attach",
            Self::EngagementDetach => "engagement.detach",
            Self::DaemonStop => "daemon.stop",
            Self::DaemonConfigReload => "daemon.config.reload",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcRequest {
    pub command: String,
    #[serde(default)]
    pub params: Value,
    pub request_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    pub status: ResponseStatus,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IpcResponse {
    pub fn ok(request_id: impl Into<String>, data: Value) -> Self {
        Self {
            status: ResponseStatus::Ok,
            request_id: request_id.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            request_id: request_id.into(),
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventType {
    AgentStatus,
    Finding,
    AuthRequest,
    StateChange,
    Heartbeat,
    DaemonShutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    pub event_type: StreamEventType,
    pub data: Value,
    pub timestamp: String,
}
