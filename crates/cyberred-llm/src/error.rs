use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("provider '{0}' is unavailable (circuit open)")]
    ProviderUnavailable(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response was not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("gateway queue is closed")]
    QueueClosed,

    #[error("retries exhausted after {0} attempts")]
    RetriesExhausted(u32),
}
