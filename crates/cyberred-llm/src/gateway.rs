//! Single front door for all model calls: one worker task drains the
//! priority queue, rate-limits, routes by complexity, and retries with
//! backoff through the circuit breaker. Grounded on spec.md §4.O.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::complexity::{infer_complexity, TaskComplexity};
use crate::error::LlmError;
use crate::provider::Provider;
use crate::queue::{PriorityQueue, QueuedRequest};
use crate::rate_limiter::RateLimiter;
use crate::retry::{retry_with_backoff, DEFAULT_MAX_ATTEMPTS};
use crate::router::Router;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub struct LlmGateway {
    queue: Arc<PriorityQueue>,
    router: Arc<Router>,
    limiter: Arc<RateLimiter>,
}

impl LlmGateway {
    /// Spawns the worker loop on the current runtime and returns a handle
    /// callers can enqueue through.
    pub fn spawn(router: Router, limiter: RateLimiter) -> Arc<Self> {
        let gateway = Arc::new(Self {
            queue: Arc::new(PriorityQueue::new()),
            router: Arc::new(router),
            limiter: Arc::new(limiter),
        });
        let worker = Arc::clone(&gateway);
        tokio::spawn(async move { worker.run().await });
        gateway
    }

    pub async fn enqueue_director(&self, prompt: impl Into<String>) -> Result<String, LlmError> {
        let prompt = prompt.into();
        let complexity = infer_complexity(&prompt);
        self.await_completion(self.queue.enqueue_director(prompt, complexity))
            .await
    }

    pub async fn enqueue_agent(&self, prompt: impl Into<String>) -> Result<String, LlmError> {
        let prompt = prompt.into();
        let complexity = infer_complexity(&prompt);
        self.await_completion(self.queue.enqueue_agent(prompt, complexity))
            .await
    }

    async fn await_completion(
        &self,
        rx: tokio::sync::oneshot::Receiver<Result<String, LlmError>>,
    ) -> Result<String, LlmError> {
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(LlmError::QueueClosed),
        }
    }

    pub fn token_usage(&self, complexity: TaskComplexity) -> crate::provider::TokenUsage {
        self.router.select_model(complexity).token_usage()
    }

    async fn run(self: Arc<Self>) {
        loop {
            let Some(request) = self.queue.dequeue() else {
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            };
            self.dispatch(request).await;
        }
    }

    async fn dispatch(&self, request: QueuedRequest) {
        while !self.limiter.try_acquire() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        let provider = self.router.select_model(request.complexity);
        let result = retry_with_backoff(DEFAULT_MAX_ATTEMPTS, || {
            let provider = Arc::clone(&provider);
            let prompt = request.prompt.clone();
            async move {
                if !provider.is_available() {
                    return Err(LlmError::ProviderUnavailable(
                        provider.model_name().to_string(),
                    ));
                }
                provider.generate(&prompt).await
            }
        })
        .await;

        match result {
            Ok(text) => self.queue.complete_request(request.id, text),
            Err(err) => {
                warn!(error = %err, "llm request failed after retries");
                self.queue.fail_request(request.id, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TokenUsage;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct FakeProvider {
        name: &'static str,
        calls: AtomicU32,
        fail_first_n: u32,
        available: AtomicBool,
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn model_name(&self) -> &str {
            self.name
        }
        fn rate_limit_rpm(&self) -> u32 {
            3000
        }
        fn token_usage(&self) -> TokenUsage {
            TokenUsage::default()
        }
        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first_n {
                return Err(LlmError::Timeout(1));
            }
            Ok(format!("{}:{prompt}", self.name))
        }
        async fn generate_structured(&self, _prompt: &str, _schema: &Value) -> Result<Value, LlmError> {
            Ok(Value::Null)
        }
        async fn health_check(&self) -> bool {
            true
        }
    }

    fn fake(name: &'static str) -> Arc<FakeProvider> {
        Arc::new(FakeProvider {
            name,
            calls: AtomicU32::new(0),
            fail_first_n: 0,
            available: AtomicBool::new(true),
        })
    }

    #[tokio::test]
    async fn agent_request_routes_to_fast_for_short_prompts() {
        let router = Router::new(fake("fast"), fake("standard"), fake("complex"));
        let gateway = LlmGateway::spawn(router, RateLimiter::new(3000, 100));
        let result = gateway.enqueue_agent("short task").await.unwrap();
        assert_eq!(result, "fast:short task");
    }

    #[tokio::test]
    async fn director_requests_are_served_before_queued_agent_requests() {
        let router = Router::new(fake("fast"), fake("standard"), fake("complex"));
        let gateway = LlmGateway::spawn(router, RateLimiter::new(3000, 100));
        let director = gateway.enqueue_director("urgent").await.unwrap();
        assert_eq!(director, "fast:urgent");
    }
}
