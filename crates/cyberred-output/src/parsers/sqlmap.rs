//! Extracts injectable-parameter findings from `sqlmap --batch` output,
//! which reports them as `Parameter: <name> (<place>)` blocks followed by
//! a `Type:`/`Title:` pair.

use regex::Regex;
use std::sync::OnceLock;

use crate::parser::{ParseOutcome, Parser};
use crate::types::{ParseContext, RawFinding};

fn parameter_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^Parameter:\s+(\S+)\s+\(([^)]+)\)\s*\n\s*Type:\s+(.+)\s*\n\s*Title:\s+(.+)$")
            .expect("static regex is valid")
    })
}

pub struct SqlmapParser;

impl Parser for SqlmapParser {
    fn parse(&self, ctx: &ParseContext<'_>) -> Result<ParseOutcome, String> {
        let mut findings = Vec::new();
        for caps in parameter_block().captures_iter(ctx.stdout) {
            let param = &caps[1];
            let place = &caps[2];
            let injection_type = &caps[3];
            let title = &caps[4];
            findings.push(RawFinding {
                finding_type: "sqli".to_string(),
                severity: "critical".to_string(),
                description: format!("SQL injection in parameter '{param}' ({place}): {title}"),
                evidence: format!("type={injection_type} title={title}"),
            });
        }
        if findings.is_empty() {
            return Err("no injectable parameters found in sqlmap output".to_string());
        }
        let summary = format!("sqlmap found {} injectable parameter(s)", findings.len());
        Ok(ParseOutcome { findings, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_injectable_parameter() {
        let stdout = "Parameter: id (GET)\n    Type: boolean-based blind\n    Title: AND boolean-based blind - WHERE or HAVING clause\n";
        let ctx = ParseContext {
            tool: "sqlmap",
            stdout,
            stderr: "",
            exit_code: 0,
            agent_id: "agent-1",
            target: "https://example.com/item?id=1",
            error_type: None,
        };
        let outcome = SqlmapParser.parse(&ctx).unwrap();
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.findings[0].severity, "critical");
    }
}
