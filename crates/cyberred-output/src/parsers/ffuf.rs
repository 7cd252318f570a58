//! Parses `ffuf -of json` output: a top-level `results` array of
//! `{url, status, length}` objects for discovered paths.

use crate::parser::{ParseOutcome, Parser};
use crate::types::{ParseContext, RawFinding};

pub struct FfufParser;

impl Parser for FfufParser {
    fn parse(&self, ctx: &ParseContext<'_>) -> Result<ParseOutcome, String> {
        let value: serde_json::Value =
            serde_json::from_str(ctx.stdout).map_err(|e| format!("ffuf output is not JSON: {e}"))?;
        let results = value
            .get("results")
            .and_then(|v| v.as_array())
            .ok_or_else(|| "ffuf output missing 'results' array".to_string())?;

        let mut findings = Vec::new();
        for entry in results {
            let url = entry.get("url").and_then(|v| v.as_str()).unwrap_or("");
            let status = entry.get("status").and_then(|v| v.as_i64()).unwrap_or(0);
            let length = entry.get("length").and_then(|v| v.as_i64()).unwrap_or(0);
            findings.push(RawFinding {
                finding_type: "discovered_path".to_string(),
                severity: "info".to_string(),
                description: format!("{url} ({status})"),
                evidence: format!("status={status} length={length}"),
            });
        }
        let summary = format!("ffuf discovered {} path(s)", findings.len());
        Ok(ParseOutcome { findings, summary })
    }
}
