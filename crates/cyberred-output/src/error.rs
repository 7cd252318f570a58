use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("parser '{tool}' failed: {reason}")]
    ParseFailed { tool: String, reason: String },

    #[error("llm gateway error: {0}")]
    Llm(String),

    #[error("llm response was not valid JSON after fence-stripping: {0}")]
    MalformedLlmResponse(String),

    #[error("llm request timed out")]
    LlmTimeout,

    #[error("hot-reload plugin '{name}' is invalid: {reason}")]
    InvalidPlugin { name: String, reason: String },
}
