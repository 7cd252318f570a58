//! Connectivity check for the shared event-bus/intelligence-cache store.
//!
//! Defined against a narrow trait rather than a direct `cyberred-bus`
//! dependency (same narrow-trait pattern `cyberred-output::LlmClient`
//! uses to avoid a crate-to-crate coupling the spec doesn't require) —
//! the daemon binary wires the real `EventBus::state()`/`PING` check in.

use std::sync::Arc;

use async_trait::async_trait;

use crate::check::{CheckResult, CheckStatus, PreflightCheck, Priority};

#[async_trait]
pub trait DataStoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), String>;
}

pub struct DataStoreCheck {
    target: Arc<dyn DataStoreHealth>,
}

impl DataStoreCheck {
    pub fn new(target: Arc<dyn DataStoreHealth>) -> Self {
        Self { target }
    }
}

#[async_trait]
impl PreflightCheck for DataStoreCheck {
    fn name(&self) -> &str {
        "data_store_connectivity"
    }

    fn priority(&self) -> Priority {
        Priority::P0
    }

    async fn execute(&self) -> CheckResult {
        match self.target.ping().await {
            Ok(()) => CheckResult::pass(self.name(), self.priority(), "event bus reachable"),
            Err(reason) => CheckResult::fail(self.name(), self.priority(), reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always(Result<(), String>);

    #[async_trait]
    impl DataStoreHealth for Always {
        async fn ping(&self) -> Result<(), String> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn reports_pass_when_reachable() {
        let check = DataStoreCheck::new(Arc::new(Always(Ok(()))));
        assert_eq!(check.execute().await.status, CheckStatus::Pass);
    }

    #[tokio::test]
    async fn reports_fail_when_unreachable() {
        let check = DataStoreCheck::new(Arc::new(Always(Err("connection refused".to_string()))));
        let result = check.execute().await;
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.priority, Priority::P0);
    }
}
