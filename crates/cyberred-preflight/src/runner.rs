//! Priority-ordered pre-flight runner: P0 checks execute before P1, and
//! result validation blocks engagement start on any P0 failure (always)
//! or any P1 warning (unless the caller passes `ignore_warnings`).

use tracing::{info, warn};

use crate::check::{CheckResult, CheckStatus, PreflightCheck, Priority};
use crate::error::PreflightError;

pub struct PreFlightRunner {
    checks: Vec<Box<dyn PreflightCheck>>,
}

impl Default for PreFlightRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl PreFlightRunner {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn register(&mut self, check: Box<dyn PreflightCheck>) {
        self.checks.push(check);
    }

    /// Run every registered check, P0 before P1.
    pub async fn run_all(&self) -> Vec<CheckResult> {
        let mut ordered: Vec<&Box<dyn PreflightCheck>> = self.checks.iter().collect();
        ordered.sort_by_key(|c| match c.priority() {
            Priority::P0 => 0,
            Priority::P1 => 1,
        });

        let mut results = Vec::with_capacity(ordered.len());
        for check in ordered {
            let result = check.execute().await;
            match result.status {
                CheckStatus::Pass => info!(check = %result.name, "pre-flight check passed"),
                CheckStatus::Warn => warn!(check = %result.name, message = %result.message, "pre-flight check warned"),
                CheckStatus::Fail => warn!(check = %result.name, message = %result.message, "pre-flight check failed"),
            }
            results.push(result);
        }
        results
    }

    /// Raises on any P0 failure; raises on any P1 warning unless
    /// `ignore_warnings` is set.
    pub fn validate_results(results: &[CheckResult], ignore_warnings: bool) -> Result<(), PreflightError> {
        let failed: Vec<String> = results
            .iter()
            .filter(|r| r.priority == Priority::P0 && r.status == CheckStatus::Fail)
            .map(|r| format!("{} ({})", r.name, r.message))
            .collect();
        if !failed.is_empty() {
            return Err(PreflightError::CheckFailed { failed });
        }

        if !ignore_warnings {
            let warned: Vec<String> = results
                .iter()
                .filter(|r| r.priority == Priority::P1 && r.status == CheckStatus::Warn)
                .map(|r| format!("{} ({})", r.name, r.message))
                .collect();
            if !warned.is_empty() {
                return Err(PreflightError::WarningPresent { warned });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedCheck {
        name: &'static str,
        priority: Priority,
        result: CheckResult,
    }

    #[async_trait]
    impl PreflightCheck for FixedCheck {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> Priority {
            self.priority
        }
        async fn execute(&self) -> CheckResult {
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn runs_p0_before_p1() {
        let mut runner = PreFlightRunner::new();
        runner.register(Box::new(FixedCheck {
            name: "memory",
            priority: Priority::P1,
            result: CheckResult::pass("memory", Priority::P1, "ok"),
        }));
        runner.register(Box::new(FixedCheck {
            name: "scope_file",
            priority: Priority::P0,
            result: CheckResult::pass("scope_file", Priority::P0, "ok"),
        }));

        let results = runner.run_all().await;
        assert_eq!(results[0].name, "scope_file");
        assert_eq!(results[1].name, "memory");
    }

    #[test]
    fn p0_failure_always_blocks() {
        let results = vec![CheckResult::fail("llm", Priority::P0, "unreachable")];
        let err = PreFlightRunner::validate_results(&results, true).unwrap_err();
        assert!(matches!(err, PreflightError::CheckFailed { .. }));
    }

    #[test]
    fn p1_warning_blocks_unless_ignored() {
        let results = vec![CheckResult::warn("disk", Priority::P1, "low disk")];
        assert!(PreFlightRunner::validate_results(&results, false).is_err());
        assert!(PreFlightRunner::validate_results(&results, true).is_ok());
    }

    #[test]
    fn passing_results_validate_cleanly() {
        let results = vec![CheckResult::pass("scope_file", Priority::P0, "ok")];
        assert!(PreFlightRunner::validate_results(&results, false).is_ok());
    }
}
