use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("sentinel discovery failed for service '{service}': no sentinel reachable")]
    SentinelDiscoveryFailed { service: String },

    #[error("signature verification failed for channel '{channel}'")]
    SignatureMismatch { channel: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not connected to the event bus")]
    NotConnected,
}
