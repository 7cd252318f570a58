use thiserror::Error;

use cyberred_scope::ScopeViolationError;

/// The sole class of error the executor lets propagate past `execute` —
/// everything else (timeouts, non-zero exit, pool exhaustion, execution
/// exceptions) comes back as a `ToolResult` value per spec.md §4.F.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error(transparent)]
    Scope(#[from] ScopeViolationError),

    #[error("unknown tool '{tool}': not present in the tool manifest")]
    UnknownTool { tool: String },

    #[error("failed to parse tool manifest: {reason}")]
    ManifestParse { reason: String },
}
