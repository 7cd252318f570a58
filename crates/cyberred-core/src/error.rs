//! Error types shared across the Cyber-Red coordination kernel.

use thiserror::Error;

/// Result type alias used throughout the kernel crates.
pub type Result<T> = std::result::Result<T, CyberRedError>;

/// Top-level error type. Component crates define their own narrower error
/// enums and convert into this one at the boundaries where they're composed
/// (the daemon binary, the IPC server).
#[derive(Error, Debug)]
pub enum CyberRedError {
    #[error("validation failed for field '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    #[error("not found: {kind} '{id}'")]
    NotFound { kind: String, id: String },

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("scope violation: {target} is not in the authorized scope")]
    ScopeViolation { target: String },

    #[error("resource exhausted: {resource}, limit: {limit}")]
    ResourceExhausted { resource: String, limit: String },

    #[error("timeout: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("configuration error: {field}: {reason}")]
    Configuration { field: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl From<serde_json::Error> for CyberRedError {
    fn from(err: serde_json::Error) -> Self {
        CyberRedError::Serialization {
            reason: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for CyberRedError {
    fn from(err: anyhow::Error) -> Self {
        CyberRedError::Internal {
            reason: err.to_string(),
        }
    }
}
