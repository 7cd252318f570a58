//! Shared data model and error types for the Cyber-Red coordination kernel.
//!
//! Every other `cyberred-*` crate depends on this one for the record shapes
//! (`Finding`, `AgentAction`, `ToolResult`, `Engagement`, intelligence
//! records) that cross component boundaries, and for the top-level
//! `CyberRedError`/`Result` used once a component's own error type is
//! converted at its public boundary.

pub mod action;
pub mod engagement;
pub mod error;
pub mod finding;
pub mod intel;
pub mod tool_result;
pub mod validate;

pub use action::AgentAction;
pub use engagement::Engagement;
pub use error::{CyberRedError, Result};
pub use finding::Finding;
pub use intel::{BufferedMessage, IntelPriority, IntelResult, StigmergicMessage};
pub use tool_result::{ToolErrorType, ToolResult};
