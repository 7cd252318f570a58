//! `Provider` is the Router's dispatch target: one implementation per
//! backing model. `HttpProvider` (see `http_provider.rs`) is the only
//! concrete implementation shipped; tests exercise the circuit breaker,
//! retry, and queue against an in-memory fake.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LlmError;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn model_name(&self) -> &str;
    fn rate_limit_rpm(&self) -> u32;
    fn token_usage(&self) -> TokenUsage;
    fn is_available(&self) -> bool;

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
    async fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<Value, LlmError>;
    async fn health_check(&self) -> bool;
}
