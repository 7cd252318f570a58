//! Parses `dnsrecon -j` output: a top-level JSON array of record objects
//! with `type`/`name`/`address` fields.

use crate::parser::{ParseOutcome, Parser};
use crate::types::{ParseContext, RawFinding};

pub struct DnsreconParser;

impl Parser for DnsreconParser {
    fn parse(&self, ctx: &ParseContext<'_>) -> Result<ParseOutcome, String> {
        let value: serde_json::Value =
            serde_json::from_str(ctx.stdout).map_err(|e| format!("dnsrecon output is not JSON: {e}"))?;
        let records = value
            .as_array()
            .ok_or_else(|| "dnsrecon output is not a JSON array".to_string())?;

        let mut findings = Vec::new();
        for record in records {
            let record_type = record.get("type").and_then(|v| v.as_str()).unwrap_or("UNKNOWN");
            let name = record.get("name").and_then(|v| v.as_str()).unwrap_or(ctx.target);
            let address = record.get("address").and_then(|v| v.as_str()).unwrap_or("");
            findings.push(RawFinding {
                finding_type: "dns_record".to_string(),
                severity: "info".to_string(),
                description: format!("{record_type} record {name} -> {address}"),
                evidence: format!("type={record_type} name={name} address={address}"),
            });
        }
        let summary = format!("dnsrecon enumerated {} record(s)", findings.len());
        Ok(ParseOutcome { findings, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dns_records() {
        let stdout = r#"[{"type":"A","name":"example.com","address":"192.0.2.10"}]"#;
        let ctx = ParseContext {
            tool: "dnsrecon",
            stdout,
            stderr: "",
            exit_code: 0,
            agent_id: "agent-1",
            target: "example.com",
            error_type: None,
        };
        let outcome = DnsreconParser.parse(&ctx).unwrap();
        assert_eq!(outcome.findings.len(), 1);
    }
}
