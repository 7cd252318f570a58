//! Pluggable sandbox runtime.
//!
//! `mode=mock` backs deterministic unit tests; `mode=real` shells out to a
//! container runtime CLI with `--network none` by default, matching the
//! integration shape of the Python original's real-container test suite.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use cyberred_core::{ToolErrorType, ToolResult};
use tokio::process::Command;
use tokio::time::timeout as tokio_timeout;

use crate::error::ContainerError;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn start(&mut self) -> Result<(), ContainerError>;
    async fn stop(&mut self) -> Result<(), ContainerError>;
    async fn is_healthy(&self) -> bool;
    async fn execute(&self, command: &[String], timeout: Duration) -> ToolResult;
}

/// In-process fake sandbox. Runs the command as a local subprocess without
/// container isolation — used for deterministic fixtures, not for real
/// tool execution.
pub struct MockRuntime {
    healthy: bool,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self { healthy: true }
    }

    pub fn set_healthy(&mut self, healthy: bool) {
        self.healthy = healthy;
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn start(&mut self) -> Result<(), ContainerError> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ContainerError> {
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        self.healthy
    }

    async fn execute(&self, command: &[String], timeout: Duration) -> ToolResult {
        run_command(command, timeout).await
    }
}

/// Real sandbox backed by `docker`/`podman`, network-isolated by default.
pub struct RealRuntime {
    container_id: Option<String>,
    image: String,
    runtime_binary: String,
}

impl RealRuntime {
    pub fn new(image: impl Into<String>, runtime_binary: impl Into<String>) -> Self {
        Self {
            container_id: None,
            image: image.into(),
            runtime_binary: runtime_binary.into(),
        }
    }
}

#[async_trait]
impl ContainerRuntime for RealRuntime {
    async fn start(&mut self) -> Result<(), ContainerError> {
        let output = Command::new(&self.runtime_binary)
            .args(["run", "-d", "--network", "none", &self.image, "sleep", "infinity"])
            .output()
            .await
            .map_err(|e| ContainerError::Runtime {
                reason: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(ContainerError::Runtime {
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        self.container_id = Some(id);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ContainerError> {
        if let Some(id) = self.container_id.take() {
            let _ = Command::new(&self.runtime_binary)
                .args(["rm", "-f", &id])
                .output()
                .await;
        }
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        let Some(id) = &self.container_id else {
            return false;
        };
        Command::new(&self.runtime_binary)
            .args(["inspect", "-f", "{{.State.Running}}", id])
            .output()
            .await
            .map(|o| o.status.success() && String::from_utf8_lossy(&o.stdout).trim() == "true")
            .unwrap_or(false)
    }

    async fn execute(&self, command: &[String], timeout: Duration) -> ToolResult {
        let Some(id) = &self.container_id else {
            return ToolResult::failure(
                String::new(),
                "container not started".to_string(),
                -1,
                0,
                ToolErrorType::ContainerCrashed,
            );
        };
        let mut args = vec![self.runtime_binary.clone(), "exec".to_string(), id.clone()];
        args.extend(command.iter().cloned());
        run_command(&args[1..], timeout).await
    }
}

async fn run_command(command: &[String], timeout: Duration) -> ToolResult {
    if command.is_empty() {
        return ToolResult::failure(
            String::new(),
            "empty command".to_string(),
            -1,
            0,
            ToolErrorType::ExecutionException,
        );
    }
    let started = Instant::now();
    let mut cmd = Command::new(&command[0]);
    cmd.args(&command[1..]);

    match tokio_timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            let duration_ms = started.elapsed().as_millis() as u64;
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            if output.status.success() {
                ToolResult::success(stdout, stderr, exit_code, duration_ms)
            } else {
                ToolResult::failure(stdout, stderr, exit_code, duration_ms, ToolErrorType::NonZeroExit)
            }
        }
        Ok(Err(e)) => ToolResult::failure(
            String::new(),
            e.to_string(),
            -1,
            started.elapsed().as_millis() as u64,
            ToolErrorType::ExecutionException,
        ),
        Err(_) => ToolResult::failure(
            String::new(),
            "execution timed out".to_string(),
            -1,
            started.elapsed().as_millis() as u64,
            ToolErrorType::Timeout,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_runtime_executes_command() {
        let runtime = MockRuntime::new();
        let result = runtime
            .execute(&["echo".to_string(), "hi".to_string()], Duration::from_secs(1))
            .await;
        assert!(result.success);
        assert!(result.stdout.contains("hi"));
    }

    #[tokio::test]
    async fn mock_runtime_reports_timeout() {
        let runtime = MockRuntime::new();
        let result = runtime
            .execute(&["sleep".to_string(), "5".to_string()], Duration::from_millis(50))
            .await;
        assert!(!result.success);
        assert_eq!(result.error_type, Some(ToolErrorType::Timeout));
    }
}
