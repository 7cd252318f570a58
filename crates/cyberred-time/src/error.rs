use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimeError {
    #[error("ntp request failed: {0}")]
    Ntp(#[from] std::io::Error),

    #[error("ntp request timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("malformed ntp response: {reason}")]
    MalformedResponse { reason: String },
}
