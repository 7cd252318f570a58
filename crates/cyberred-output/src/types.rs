//! Shapes passed through the three-tier output pipeline.

use cyberred_core::Finding;
use serde::{Deserialize, Serialize};

/// Everything a parser or the Tier-2 prompt builder needs to know about
/// one completed tool invocation.
#[derive(Debug, Clone)]
pub struct ParseContext<'a> {
    pub tool: &'a str,
    pub stdout: &'a str,
    pub stderr: &'a str,
    pub exit_code: i32,
    pub agent_id: &'a str,
    pub target: &'a str,
    pub error_type: Option<&'a str>,
}

/// A finding as minted by a parser, before the processor assigns it an id,
/// timestamp, topic and signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFinding {
    #[serde(rename = "type")]
    pub finding_type: String,
    pub severity: String,
    pub description: String,
    pub evidence: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tier {
    Parser = 1,
    Llm = 2,
    Raw = 3,
}

#[derive(Debug, Clone)]
pub struct ProcessedOutput {
    pub findings: Vec<Finding>,
    pub summary: String,
    pub raw_truncated: String,
    pub tier: Tier,
}
