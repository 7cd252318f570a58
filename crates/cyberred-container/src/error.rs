use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("container pool exhausted: no sandbox available within timeout")]
    PoolExhausted,

    #[error("container runtime error: {reason}")]
    Runtime { reason: String },

    #[error("container is unhealthy")]
    Unhealthy,
}
