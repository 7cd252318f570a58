//! Maps `TaskComplexity` to a `Provider`. `select_model` never fails — an
//! unavailable provider's breaker is reported via `Provider::is_available`
//! and it's up to the caller (the gateway worker) to decide whether to
//! bubble `LLMProviderUnavailable` or fall over to another tier.

use std::sync::Arc;

use crate::complexity::TaskComplexity;
use crate::provider::Provider;

pub use crate::complexity::infer_complexity;

pub struct Router {
    fast: Arc<dyn Provider>,
    standard: Arc<dyn Provider>,
    complex: Arc<dyn Provider>,
}

impl Router {
    pub fn new(
        fast: Arc<dyn Provider>,
        standard: Arc<dyn Provider>,
        complex: Arc<dyn Provider>,
    ) -> Self {
        Self {
            fast,
            standard,
            complex,
        }
    }

    pub fn select_model(&self, complexity: TaskComplexity) -> Arc<dyn Provider> {
        match complexity {
            TaskComplexity::Fast => Arc::clone(&self.fast),
            TaskComplexity::Standard => Arc::clone(&self.standard),
            TaskComplexity::Complex => Arc::clone(&self.complex),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::provider::TokenUsage;
    use async_trait::async_trait;
    use serde_json::Value;

    struct NamedProvider(&'static str);

    #[async_trait]
    impl Provider for NamedProvider {
        fn model_name(&self) -> &str {
            self.0
        }
        fn rate_limit_rpm(&self) -> u32 {
            30
        }
        fn token_usage(&self) -> TokenUsage {
            TokenUsage::default()
        }
        fn is_available(&self) -> bool {
            true
        }
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
        async fn generate_structured(&self, _prompt: &str, _schema: &Value) -> Result<Value, LlmError> {
            Ok(Value::Null)
        }
        async fn health_check(&self) -> bool {
            true
        }
    }

    #[test]
    fn routes_each_complexity_to_its_tier() {
        let router = Router::new(
            Arc::new(NamedProvider("fast-model")),
            Arc::new(NamedProvider("standard-model")),
            Arc::new(NamedProvider("complex-model")),
        );
        assert_eq!(
            router.select_model(TaskComplexity::Fast).model_name(),
            "fast-model"
        );
        assert_eq!(
            router.select_model(TaskComplexity::Standard).model_name(),
            "standard-model"
        );
        assert_eq!(
            router.select_model(TaskComplexity::Complex).model_name(),
            "complex-model"
        );
    }
}
