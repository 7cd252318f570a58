//! Shipped Tier-1 parsers — the four MCP-adapter tools from SPEC_FULL §4.G
//! (`nmap`, `sqlmap`, `nikto`, `ffuf`) plus the teacher-adjacent scanners
//! named alongside them (`nuclei`, `masscan`, `subfinder`, `dnsrecon`).
//! Each is a thin regex extraction over the tool's plain-text/JSON output;
//! none attempt to be a full parser for their tool's format, only to pull
//! the fields a Finding needs.

mod dnsrecon;
mod ffuf;
mod masscan;
mod nikto;
mod nmap;
mod nuclei;
mod sqlmap;
mod subfinder;

use std::sync::Arc;

use crate::parser::{Parser, ParserRegistry};

/// Register all shipped parsers under their tool names.
pub fn register_builtin(registry: &ParserRegistry) {
    registry.register("nmap", Arc::new(nmap::NmapParser) as Arc<dyn Parser>);
    registry.register("sqlmap", Arc::new(sqlmap::SqlmapParser) as Arc<dyn Parser>);
    registry.register("nikto", Arc::new(nikto::NiktoParser) as Arc<dyn Parser>);
    registry.register("ffuf", Arc::new(ffuf::FfufParser) as Arc<dyn Parser>);
    registry.register("nuclei", Arc::new(nuclei::NucleiParser) as Arc<dyn Parser>);
    registry.register("masscan", Arc::new(masscan::MasscanParser) as Arc<dyn Parser>);
    registry.register("subfinder", Arc::new(subfinder::SubfinderParser) as Arc<dyn Parser>);
    registry.register("dnsrecon", Arc::new(dnsrecon::DnsreconParser) as Arc<dyn Parser>);
}
