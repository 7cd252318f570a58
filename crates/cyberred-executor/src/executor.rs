//! Tool Executor — the one place a tool invocation actually runs.
//!
//! Order of operations exactly per spec.md §4.F: (1) manifest + scope gate
//! (the sole propagating error), (2) acquire a container within timeout,
//! (3) run with a timeout, (4) unexpected execution errors, (5) non-zero
//! exit. Every other outcome is folded into a `ToolResult` value so that
//! "the tool failed" is never confused with "the system is broken."

use std::time::{Duration, Instant};

use cyberred_container::ContainerPool;
use cyberred_core::{ToolErrorType, ToolResult};
use cyberred_scope::ScopeValidator;
use tracing::{info, instrument};

use crate::error::ExecutorError;
use crate::manifest::ToolManifest;

pub struct ToolExecutor {
    scope: ScopeValidator,
    manifest: ToolManifest,
    pool: ContainerPool,
}

impl ToolExecutor {
    pub fn new(scope: ScopeValidator, manifest: ToolManifest, pool: ContainerPool) -> Self {
        Self {
            scope,
            manifest,
            pool,
        }
    }

    /// Execute `argv` (argv[0] is the tool name) against `target`, gating
    /// on the manifest and scope before anything touches a container.
    #[instrument(skip(self, argv), fields(tool = %argv.first().map(String::as_str).unwrap_or("")))]
    pub async fn execute(
        &self,
        argv: &[String],
        target: &str,
        timeout: Duration,
    ) -> Result<ToolResult, ExecutorError> {
        let tool = argv.first().map(String::as_str).unwrap_or("");
        if !self.manifest.is_known(tool) {
            return Err(ExecutorError::UnknownTool {
                tool: tool.to_string(),
            });
        }

        self.scope.validate_target(target)?;
        self.scope.validate_command(&argv.join(" "))?;

        let lease = match self.pool.acquire(timeout).await {
            Ok(lease) => lease,
            Err(_) => {
                return Ok(ToolResult::failure(
                    String::new(),
                    "container pool exhausted".to_string(),
                    -1,
                    0,
                    ToolErrorType::PoolExhausted,
                ));
            }
        };

        let started = Instant::now();
        let result = lease.runtime().execute(argv, timeout).await;
        info!(
            duration_ms = started.elapsed().as_millis() as u64,
            success = result.success,
            "tool execution complete"
        );
        Ok(result)
    }
}
