//! Verifies the engagement's scope file exists and parses as YAML before
//! the engagement is allowed to start.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::check::{CheckResult, PreflightCheck, Priority};

pub struct ScopeFileCheck {
    path: PathBuf,
}

impl ScopeFileCheck {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl PreflightCheck for ScopeFileCheck {
    fn name(&self) -> &str {
        "scope_file"
    }

    fn priority(&self) -> Priority {
        Priority::P0
    }

    async fn execute(&self) -> CheckResult {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) => {
                return CheckResult::fail(
                    self.name(),
                    self.priority(),
                    format!("scope file {} unreadable: {err}", self.path.display()),
                )
            }
        };

        match serde_yaml::from_str::<serde_yaml::Value>(&contents) {
            Ok(_) => CheckResult::pass(self.name(), self.priority(), "scope file parses"),
            Err(err) => CheckResult::fail(self.name(), self.priority(), format!("scope file invalid YAML: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckStatus;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn valid_yaml_passes() {
        let file = NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), "allow_private: false\nallowed_networks: [\"192.0.2.0/24\"]\n")
            .await
            .unwrap();
        let check = ScopeFileCheck::new(file.path().to_path_buf());
        assert_eq!(check.execute().await.status, CheckStatus::Pass);
    }

    #[tokio::test]
    async fn missing_file_fails() {
        let check = ScopeFileCheck::new(PathBuf::from("/nonexistent/scope.yaml"));
        assert_eq!(check.execute().await.status, CheckStatus::Fail);
    }

    #[tokio::test]
    async fn malformed_yaml_fails() {
        let file = NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), "not: [valid: yaml").await.unwrap();
        let check = ScopeFileCheck::new(file.path().to_path_buf());
        assert_eq!(check.execute().await.status, CheckStatus::Fail);
    }
}
