//! LLM Gateway: priority queue, rate limiter, complexity-routed provider
//! selection, circuit breaker, and retry. Grounded on spec.md §4.O.

pub mod circuit_breaker;
pub mod complexity;
pub mod error;
pub mod gateway;
pub mod http_provider;
pub mod provider;
pub mod queue;
pub mod rate_limiter;
pub mod retry;
pub mod router;

pub use circuit_breaker::CircuitBreaker;
pub use complexity::{infer_complexity, TaskComplexity};
pub use error::LlmError;
pub use gateway::LlmGateway;
pub use http_provider::HttpProvider;
pub use provider::{Provider, TokenUsage};
pub use queue::{PriorityQueue, QueuePriority, QueuedRequest};
pub use rate_limiter::RateLimiter;
pub use router::Router;
