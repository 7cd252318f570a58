//! Parses masscan's default text output:
//! `Discovered open port <port>/<proto> on <ip>`.

use regex::Regex;
use std::sync::OnceLock;

use crate::parser::{ParseOutcome, Parser};
use crate::types::{ParseContext, RawFinding};

fn discovered_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^Discovered open port (\d+)/(\w+) on (\S+)$").expect("static regex is valid")
    })
}

pub struct MasscanParser;

impl Parser for MasscanParser {
    fn parse(&self, ctx: &ParseContext<'_>) -> Result<ParseOutcome, String> {
        let mut findings = Vec::new();
        for caps in discovered_line().captures_iter(ctx.stdout) {
            let port = &caps[1];
            let proto = &caps[2];
            let ip = &caps[3];
            findings.push(RawFinding {
                finding_type: "open_port".to_string(),
                severity: "info".to_string(),
                description: format!("{port}/{proto} open on {ip}"),
                evidence: format!("{port}/{proto} {ip}"),
            });
        }
        let summary = format!("masscan found {} open port(s)", findings.len());
        Ok(ParseOutcome { findings, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_discovered_ports() {
        let stdout = "Discovered open port 443/tcp on 192.0.2.10\nDiscovered open port 22/tcp on 192.0.2.10\n";
        let ctx = ParseContext {
            tool: "masscan",
            stdout,
            stderr: "",
            exit_code: 0,
            agent_id: "agent-1",
            target: "192.0.2.10",
            error_type: None,
        };
        let outcome = MasscanParser.parse(&ctx).unwrap();
        assert_eq!(outcome.findings.len(), 2);
    }
}
