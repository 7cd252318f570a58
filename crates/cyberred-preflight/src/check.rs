//! Shared readiness-check shape, per spec.md §4.K.
//!
//! Each check is its own struct holding whatever it needs to run (a Redis
//! URL, a scope path, a handle to the keystore) rather than receiving a
//! generic "config" bag at call time — more idiomatic than the Python
//! ABC's `execute(config)` signature, and each check's dependencies are
//! then visible in its constructor instead of threaded through a shared
//! blob (see DESIGN.md Open Question decisions).

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    P0,
    P1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub priority: Priority,
    pub message: String,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, priority: Priority, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Pass,
            priority,
            message: message.into(),
        }
    }

    pub fn warn(name: impl Into<String>, priority: Priority, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Warn,
            priority,
            message: message.into(),
        }
    }

    pub fn fail(name: impl Into<String>, priority: Priority, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Fail,
            priority,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait PreflightCheck: Send + Sync {
    fn name(&self) -> &str;
    fn priority(&self) -> Priority;
    async fn execute(&self) -> CheckResult;
}
