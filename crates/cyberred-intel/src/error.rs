use thiserror::Error;

/// Internal cache/transport failures. Never surfaces past the aggregator —
/// `IntelligenceAggregator::query` never raises, per spec.md §4.H's agent
/// continuity guarantee; these are logged and folded into an empty or
/// stale result instead.
#[derive(Error, Debug)]
pub enum IntelError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache entry corrupted: {0}")]
    CorruptCache(String),

    #[error(transparent)]
    Bus(#[from] cyberred_bus::BusError),
}
