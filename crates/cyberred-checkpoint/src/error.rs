use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("checkpoint at {path} failed integrity check: expected signature {expected}, computed {actual}")]
    Integrity {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("checkpoint at {path} was created under a different scope: stored hash {stored}, current hash {current}")]
    ScopeChanged {
        path: String,
        stored: String,
        current: String,
    },

    #[error("checkpoint task panicked: {0}")]
    TaskJoin(String),
}
