//! The Output Processor's view of the LLM Gateway: a minimal async
//! `generate` call. Kept as a narrow trait here (rather than a dependency
//! on `cyberred-llm`) so the two crates don't need to know about each
//! other — the daemon binary wires a concrete gateway adapter in.

use async_trait::async_trait;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, String>;
}
