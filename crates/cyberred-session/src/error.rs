use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("configuration error at '{path}': {reason}")]
    Configuration { path: String, reason: String },

    #[error("engagement '{0}' not found")]
    NotFound(String),

    #[error("at capacity: {max} engagements already registered")]
    CapacityExceeded { max: usize },

    #[error("pre-flight checks failed: {0}")]
    PreflightFailed(String),

    #[error("invalid state transition: {0}")]
    StateTransition(#[from] cyberred_state::InvalidStateTransition),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] cyberred_checkpoint::CheckpointError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("subscription '{0}' not found")]
    SubscriptionNotFound(String),
}
