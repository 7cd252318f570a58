//! LLM Gateway reachability check.

use std::sync::Arc;

use async_trait::async_trait;

use crate::check::{CheckResult, CheckStatus, PreflightCheck, Priority};

#[async_trait]
pub trait LlmHealth: Send + Sync {
    async fn health_check(&self) -> bool;
}

pub struct LlmReachabilityCheck {
    gateway: Arc<dyn LlmHealth>,
}

impl LlmReachabilityCheck {
    pub fn new(gateway: Arc<dyn LlmHealth>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl PreflightCheck for LlmReachabilityCheck {
    fn name(&self) -> &str {
        "llm_reachability"
    }

    fn priority(&self) -> Priority {
        Priority::P0
    }

    async fn execute(&self) -> CheckResult {
        if self.gateway.health_check().await {
            CheckResult::pass(self.name(), self.priority(), "llm gateway healthy")
        } else {
            CheckResult::fail(self.name(), self.priority(), "llm gateway unreachable")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(bool);

    #[async_trait]
    impl LlmHealth for Fixed {
        async fn health_check(&self) -> bool {
            self.0
        }
    }

    #[tokio::test]
    async fn healthy_gateway_passes() {
        let check = LlmReachabilityCheck::new(Arc::new(Fixed(true)));
        assert_eq!(check.execute().await.status, CheckStatus::Pass);
    }

    #[tokio::test]
    async fn unhealthy_gateway_fails_as_p0() {
        let check = LlmReachabilityCheck::new(Arc::new(Fixed(false)));
        let result = check.execute().await;
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.priority, Priority::P0);
    }
}
