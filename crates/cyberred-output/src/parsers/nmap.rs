//! Extracts `<port>/tcp open <service>` lines from `nmap -oN`/default
//! text output.

use regex::Regex;
use std::sync::OnceLock;

use crate::parser::{ParseOutcome, Parser};
use crate::types::{ParseContext, RawFinding};

fn port_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(\d+)/(tcp|udp)\s+open\s+(\S+)(.*)$").expect("static regex is valid")
    })
}

pub struct NmapParser;

impl Parser for NmapParser {
    fn parse(&self, ctx: &ParseContext<'_>) -> Result<ParseOutcome, String> {
        let mut findings = Vec::new();
        for caps in port_line().captures_iter(ctx.stdout) {
            let port = &caps[1];
            let proto = &caps[2];
            let service = &caps[3];
            let extra = caps[4].trim();
            findings.push(RawFinding {
                finding_type: "open_port".to_string(),
                severity: "info".to_string(),
                description: format!("{port}/{proto} open ({service})"),
                evidence: format!("{port}/{proto} open {service} {extra}").trim().to_string(),
            });
        }
        if findings.is_empty() && ctx.exit_code != 0 {
            return Err("no open ports parsed and nmap exited non-zero".to_string());
        }
        let summary = format!("nmap found {} open port(s) on {}", findings.len(), ctx.target);
        Ok(ParseOutcome { findings, summary })
    }
}
