//! Parses `nikto -Format json` output: a top-level `vulnerabilities`
//! array of `{id, method, msg, uri, OSVDBID}` objects.

use crate::parser::{ParseOutcome, Parser};
use crate::types::{ParseContext, RawFinding};

pub struct NiktoParser;

impl Parser for NiktoParser {
    fn parse(&self, ctx: &ParseContext<'_>) -> Result<ParseOutcome, String> {
        let value: serde_json::Value =
            serde_json::from_str(ctx.stdout).map_err(|e| format!("nikto output is not JSON: {e}"))?;
        let entries = value
            .get("vulnerabilities")
            .and_then(|v| v.as_array())
            .ok_or_else(|| "nikto output missing 'vulnerabilities' array".to_string())?;

        let mut findings = Vec::new();
        for entry in entries {
            let msg = entry.get("msg").and_then(|v| v.as_str()).unwrap_or("unspecified finding");
            let uri = entry.get("uri").and_then(|v| v.as_str()).unwrap_or("/");
            let method = entry.get("method").and_then(|v| v.as_str()).unwrap_or("GET");
            findings.push(RawFinding {
                finding_type: "web_vulnerability".to_string(),
                severity: "medium".to_string(),
                description: msg.to_string(),
                evidence: format!("{method} {uri}: {msg}"),
            });
        }
        let summary = format!("nikto reported {} finding(s)", findings.len());
        Ok(ParseOutcome { findings, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vulnerabilities_array() {
        let stdout = r#"{"vulnerabilities":[{"id":"1","method":"GET","uri":"/admin","msg":"Admin console exposed","OSVDBID":"0"}]}"#;
        let ctx = ParseContext {
            tool: "nikto",
            stdout,
            stderr: "",
            exit_code: 0,
            agent_id: "agent-1",
            target: "https://example.com",
            error_type: None,
        };
        let outcome = NiktoParser.parse(&ctx).unwrap();
        assert_eq!(outcome.findings.len(), 1);
        assert!(outcome.findings[0].description.contains("Admin console"));
    }

    #[test]
    fn errors_on_non_json_stdout() {
        let ctx = ParseContext {
            tool: "nikto",
            stdout: "not json",
            stderr: "",
            exit_code: 1,
            agent_id: "agent-1",
            target: "https://example.com",
            error_type: Some("NON_ZERO_EXIT"),
        };
        assert!(NiktoParser.parse(&ctx).is_err());
    }
}
