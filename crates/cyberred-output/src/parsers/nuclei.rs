//! Parses `nuclei -jsonl` output: one JSON object per line with
//! `template-id`, `info.severity`, `info.name`, `matched-at`.

use crate::parser::{ParseOutcome, Parser};
use crate::types::{ParseContext, RawFinding};

pub struct NucleiParser;

impl Parser for NucleiParser {
    fn parse(&self, ctx: &ParseContext<'_>) -> Result<ParseOutcome, String> {
        let mut findings = Vec::new();
        for line in ctx.stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry: serde_json::Value =
                serde_json::from_str(line).map_err(|e| format!("malformed nuclei JSONL line: {e}"))?;
            let template_id = entry.get("template-id").and_then(|v| v.as_str()).unwrap_or("unknown");
            let severity = entry
                .get("info")
                .and_then(|i| i.get("severity"))
                .and_then(|v| v.as_str())
                .unwrap_or("info");
            let name = entry
                .get("info")
                .and_then(|i| i.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or(template_id);
            let matched_at = entry.get("matched-at").and_then(|v| v.as_str()).unwrap_or(ctx.target);
            findings.push(RawFinding {
                finding_type: "template_match".to_string(),
                severity: normalize_severity(severity),
                description: format!("{name} ({template_id})"),
                evidence: format!("matched-at={matched_at}"),
            });
        }
        let summary = format!("nuclei matched {} template(s)", findings.len());
        Ok(ParseOutcome { findings, summary })
    }
}

fn normalize_severity(raw: &str) -> String {
    match raw.to_lowercase().as_str() {
        "critical" => "critical",
        "high" => "high",
        "medium" => "medium",
        "low" => "low",
        _ => "info",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_jsonl_lines() {
        let stdout = r#"{"template-id":"CVE-2021-44228","info":{"severity":"critical","name":"Log4Shell"},"matched-at":"192.0.2.10:8080"}
"#;
        let ctx = ParseContext {
            tool: "nuclei",
            stdout,
            stderr: "",
            exit_code: 0,
            agent_id: "agent-1",
            target: "192.0.2.10",
            error_type: None,
        };
        let outcome = NucleiParser.parse(&ctx).unwrap();
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.findings[0].severity, "critical");
    }

    #[test]
    fn ignores_blank_lines() {
        let ctx = ParseContext {
            tool: "nuclei",
            stdout: "\n\n",
            stderr: "",
            exit_code: 0,
            agent_id: "agent-1",
            target: "192.0.2.10",
            error_type: None,
        };
        let outcome = NucleiParser.parse(&ctx).unwrap();
        assert!(outcome.findings.is_empty());
    }
}
