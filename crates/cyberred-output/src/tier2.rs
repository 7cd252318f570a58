//! Tier-2 LLM distillation: compose a prompt, call the gateway, strip
//! markdown fences, parse `{findings:[...], summary}`.

use serde::Deserialize;

use crate::error::OutputError;
use crate::types::{ParseContext, RawFinding};

const MAX_STDOUT_CHARS: usize = 4000;
const MAX_STDERR_CHARS: usize = 1000;

/// Ported in structure from `output.py`'s `TIER2_SUMMARIZATION_PROMPT`:
/// tool name, exit code, optional error context, then truncated
/// stdout/stderr.
pub fn build_prompt(ctx: &ParseContext<'_>) -> String {
    let stdout = truncate(ctx.stdout, MAX_STDOUT_CHARS);
    let stderr = truncate(ctx.stderr, MAX_STDERR_CHARS);
    let error_line = ctx
        .error_type
        .map(|e| format!("\nError type: {e}"))
        .unwrap_or_default();

    format!(
        "You are distilling raw security tool output into structured findings.\n\
         Tool: {tool}\nExit code: {exit_code}{error_line}\nTarget: {target}\n\n\
         STDOUT:\n{stdout}\n\nSTDERR:\n{stderr}\n\n\
         Respond with JSON exactly matching: \
         {{\"findings\":[{{\"type\":\"...\",\"severity\":\"critical|high|medium|low|info\",\
         \"description\":\"...\",\"evidence\":\"...\"}}],\"summary\":\"...\"}}",
        tool = ctx.tool,
        exit_code = ctx.exit_code,
        target = ctx.target,
        stdout = stdout,
        stderr = stderr,
    )
}

#[derive(Debug, Deserialize)]
struct LlmResponse {
    findings: Vec<RawFinding>,
    summary: String,
}

/// Strip a leading/trailing ```` ```json ```` or ```` ``` ```` fence, then
/// parse the `{findings, summary}` shape.
pub fn parse_response(raw: &str) -> Result<(Vec<RawFinding>, String), OutputError> {
    let stripped = strip_fences(raw);
    let parsed: LlmResponse = serde_json::from_str(stripped)
        .map_err(|e| OutputError::MalformedLlmResponse(e.to_string()))?;
    Ok((parsed.findings, parsed.summary))
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_open = after_open.strip_prefix("json").unwrap_or(after_open);
    let after_open = after_open.trim_start_matches(['\n', '\r']);
    after_open.strip_suffix("```").map(str::trim_end).unwrap_or(after_open)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}... [truncated]", &s[..max])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json_response() {
        let raw = "```json\n{\"findings\":[{\"type\":\"open_port\",\"severity\":\"medium\",\"description\":\"22\",\"evidence\":\"22/tcp\"}],\"summary\":\"x\"}\n```";
        let (findings, summary) = parse_response(raw).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(summary, "x");
    }

    #[test]
    fn parses_unfenced_json_response() {
        let raw = r#"{"findings":[],"summary":"nothing found"}"#;
        let (findings, summary) = parse_response(raw).unwrap();
        assert!(findings.is_empty());
        assert_eq!(summary, "nothing found");
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_response("not json at all").is_err());
    }

    #[test]
    fn prompt_includes_error_type_when_present() {
        let ctx = ParseContext {
            tool: "nmap",
            stdout: "",
            stderr: "",
            exit_code: 1,
            agent_id: "agent-1",
            target: "192.0.2.10",
            error_type: Some("TIMEOUT"),
        };
        let prompt = build_prompt(&ctx);
        assert!(prompt.contains("Error type: TIMEOUT"));
    }
}
