use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message of {0} bytes exceeds the {1} byte frame limit")]
    FrameTooLarge(usize, usize),

    #[error("malformed request: {0}")]
    MalformedRequest(#[from] serde_json::Error),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("another daemon instance is already running (pid {0})")]
    AlreadyRunning(u32),
}
