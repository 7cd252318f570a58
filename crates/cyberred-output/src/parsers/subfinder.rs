//! Parses `subfinder -json` output: one JSON object per line with a
//! `host` field naming a discovered subdomain.

use crate::parser::{ParseOutcome, Parser};
use crate::types::{ParseContext, RawFinding};

pub struct SubfinderParser;

impl Parser for SubfinderParser {
    fn parse(&self, ctx: &ParseContext<'_>) -> Result<ParseOutcome, String> {
        let mut findings = Vec::new();
        for line in ctx.stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry: serde_json::Value =
                serde_json::from_str(line).map_err(|e| format!("malformed subfinder JSON line: {e}"))?;
            let Some(host) = entry.get("host").and_then(|v| v.as_str()) else {
                continue;
            };
            findings.push(RawFinding {
                finding_type: "subdomain".to_string(),
                severity: "info".to_string(),
                description: format!("discovered subdomain {host}"),
                evidence: host.to_string(),
            });
        }
        let summary = format!("subfinder discovered {} subdomain(s)", findings.len());
        Ok(ParseOutcome { findings, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subdomains() {
        let stdout = "{\"host\":\"api.example.com\"}\n{\"host\":\"staging.example.com\"}\n";
        let ctx = ParseContext {
            tool: "subfinder",
            stdout,
            stderr: "",
            exit_code: 0,
            agent_id: "agent-1",
            target: "example.com",
            error_type: None,
        };
        let outcome = SubfinderParser.parse(&ctx).unwrap();
        assert_eq!(outcome.findings.len(), 2);
    }
}
