//! Three-tier output extraction: deterministic parser, then LLM
//! distillation, then raw truncation. Never raises — a failure at any
//! tier falls through to the next, per spec.md §4.G.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cyberred_bus::stigmergic::finding_topic;
use cyberred_core::Finding;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::cache::Tier2Cache;
use crate::llm_client::LlmClient;
use crate::parser::ParserRegistry;
use crate::tier2::{build_prompt, parse_response};
use crate::types::{ParseContext, ProcessedOutput, RawFinding, Tier};

type HmacSha256 = Hmac<Sha256>;

const MAX_RAW_LENGTH: usize = 4000;
const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// Supplies NTP-disciplined timestamps without tying this crate to
/// `cyberred-time` directly — mirrors `LlmClient`'s decoupling.
pub trait TimestampSource: Send + Sync {
    fn now(&self) -> String;
}

pub struct OutputProcessor {
    registry: ParserRegistry,
    llm: Arc<dyn LlmClient>,
    cache: Tier2Cache,
    time: Arc<dyn TimestampSource>,
    signing_key: Vec<u8>,
    llm_timeout: Duration,
}

impl OutputProcessor {
    pub fn new(
        registry: ParserRegistry,
        llm: Arc<dyn LlmClient>,
        time: Arc<dyn TimestampSource>,
        signing_key: Vec<u8>,
    ) -> Self {
        Self {
            registry,
            llm,
            cache: Tier2Cache::new(),
            time,
            signing_key,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
        }
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub async fn process(&self, ctx: &ParseContext<'_>) -> ProcessedOutput {
        if let Some(parser) = self.registry.get(ctx.tool) {
            match parser.parse(ctx) {
                Ok(outcome) => {
                    return ProcessedOutput {
                        findings: self.mint_all(&outcome.findings, ctx),
                        summary: outcome.summary,
                        raw_truncated: String::new(),
                        tier: Tier::Parser,
                    };
                }
                Err(reason) => {
                    warn!(tool = ctx.tool, %reason, "tier-1 parser failed, falling through to tier-2");
                }
            }
        }

        if let Some((findings, summary)) = self.tier2(ctx).await {
            return ProcessedOutput {
                findings: self.mint_all(&findings, ctx),
                summary,
                raw_truncated: String::new(),
                tier: Tier::Llm,
            };
        }

        ProcessedOutput {
            findings: Vec::new(),
            summary: format!("tier-1 and tier-2 extraction unavailable for '{}', raw output truncated", ctx.tool),
            raw_truncated: truncate(ctx.stdout, MAX_RAW_LENGTH),
            tier: Tier::Raw,
        }
    }

    async fn tier2(&self, ctx: &ParseContext<'_>) -> Option<(Vec<RawFinding>, String)> {
        let key = Tier2Cache::key(ctx.tool, ctx.stdout, ctx.stderr);
        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }

        let prompt = build_prompt(ctx);
        let raw = match tokio::time::timeout(self.llm_timeout, self.llm.generate(&prompt)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(reason)) => {
                warn!(tool = ctx.tool, %reason, "tier-2 llm call failed, falling through to tier-3");
                return None;
            }
            Err(_) => {
                warn!(tool = ctx.tool, "tier-2 llm call timed out, falling through to tier-3");
                return None;
            }
        };

        match parse_response(&raw) {
            Ok((findings, summary)) => {
                self.cache.put(key, findings.clone(), summary.clone());
                Some((findings, summary))
            }
            Err(reason) => {
                warn!(tool = ctx.tool, %reason, "tier-2 llm response malformed, falling through to tier-3");
                None
            }
        }
    }

    fn mint_all(&self, raw: &[RawFinding], ctx: &ParseContext<'_>) -> Vec<Finding> {
        raw.iter().filter_map(|f| self.mint(f, ctx)).collect()
    }

    fn mint(&self, raw: &RawFinding, ctx: &ParseContext<'_>) -> Option<Finding> {
        let id = Uuid::new_v4().to_string();
        let timestamp = self.time.now();
        let topic = finding_topic(ctx.target, &raw.finding_type);

        let unsigned = Finding::new(
            id.clone(),
            raw.finding_type.clone(),
            raw.severity.clone(),
            ctx.target.to_string(),
            raw.evidence.clone(),
            ctx.agent_id.to_string(),
            timestamp.clone(),
            ctx.tool.to_string(),
            topic.clone(),
            String::new(),
        );
        let unsigned = match unsigned {
            Ok(f) => f,
            Err(reason) => {
                warn!(tool = ctx.tool, %reason, "dropping finding that failed validation");
                return None;
            }
        };

        let signature = self.sign(&unsigned);
        Finding::new(
            id,
            raw.finding_type.clone(),
            raw.severity.clone(),
            ctx.target.to_string(),
            raw.evidence.clone(),
            ctx.agent_id.to_string(),
            timestamp,
            ctx.tool.to_string(),
            topic,
            signature,
        )
        .ok()
    }

    /// HMAC-SHA256 over the finding's canonical JSON with the signature
    /// field left empty, matching the bus envelope's sign-then-verify
    /// convention (`cyberred-bus::envelope`).
    fn sign(&self, finding: &Finding) -> String {
        let canonical = finding.to_canonical_json().unwrap_or_default();
        let mut mac =
            HmacSha256::new_from_slice(&self.signing_key).expect("HMAC accepts any key length");
        mac.update(&canonical);
        BASE64.encode(mac.finalize().into_bytes())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}... [truncated]", &s[..max])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedTime;
    impl TimestampSource for FixedTime {
        fn now(&self) -> String {
            "2025-12-27T23:30:00Z".to_string()
        }
    }

    struct StubLlm {
        response: String,
        calls: AtomicUsize,
    }
    #[async_trait]
    impl LlmClient for StubLlm {
        async fn generate(&self, _prompt: &str) -> Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    struct FailingLlm;
    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn generate(&self, _prompt: &str) -> Result<String, String> {
            Err("gateway unavailable".to_string())
        }
    }

    fn ctx<'a>(tool: &'a str, stdout: &'a str) -> ParseContext<'a> {
        ParseContext {
            tool,
            stdout,
            stderr: "",
            exit_code: 0,
            agent_id: "agent-1",
            target: "192.0.2.10",
            error_type: None,
        }
    }

    #[tokio::test]
    async fn tier1_parser_wins_when_registered_and_succeeds() {
        let registry = ParserRegistry::new();
        crate::parsers::register_builtin(&registry);
        let llm = Arc::new(StubLlm {
            response: String::new(),
            calls: AtomicUsize::new(0),
        });
        let processor = OutputProcessor::new(
            registry,
            llm.clone(),
            Arc::new(FixedTime),
            b"engagement-key".to_vec(),
        );

        let c = ctx("nmap", "22/tcp open ssh\n");
        let output = processor.process(&c).await;
        assert_eq!(output.tier, Tier::Parser);
        assert_eq!(output.findings.len(), 1);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_through_to_tier2_when_no_parser_registered() {
        let registry = ParserRegistry::new();
        let llm = Arc::new(StubLlm {
            response: r#"{"findings":[{"type":"misc","severity":"low","description":"d","evidence":"e"}],"summary":"s"}"#.to_string(),
            calls: AtomicUsize::new(0),
        });
        let processor =
            OutputProcessor::new(registry, llm.clone(), Arc::new(FixedTime), b"key".to_vec());

        let c = ctx("some-unknown-tool", "raw output");
        let output = processor.process(&c).await;
        assert_eq!(output.tier, Tier::Llm);
        assert_eq!(output.findings.len(), 1);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_through_to_tier3_when_llm_fails() {
        let registry = ParserRegistry::new();
        let processor = OutputProcessor::new(
            registry,
            Arc::new(FailingLlm),
            Arc::new(FixedTime),
            b"key".to_vec(),
        );

        let c = ctx("some-unknown-tool", "raw unparsed output");
        let output = processor.process(&c).await;
        assert_eq!(output.tier, Tier::Raw);
        assert!(output.findings.is_empty());
        assert!(output.raw_truncated.contains("raw unparsed output"));
    }

    #[tokio::test]
    async fn tier2_results_are_cached_across_calls() {
        let registry = ParserRegistry::new();
        let llm = Arc::new(StubLlm {
            response: r#"{"findings":[],"summary":"nothing"}"#.to_string(),
            calls: AtomicUsize::new(0),
        });
        let processor =
            OutputProcessor::new(registry, llm.clone(), Arc::new(FixedTime), b"key".to_vec());

        let c = ctx("some-unknown-tool", "same output");
        processor.process(&c).await;
        processor.process(&c).await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn minted_findings_carry_distinct_signatures_per_key() {
        let registry = ParserRegistry::new();
        let llm = Arc::new(FailingLlm);
        let a = OutputProcessor::new(registry, llm.clone(), Arc::new(FixedTime), b"key-a".to_vec());
        let registry_b = ParserRegistry::new();
        let b = OutputProcessor::new(registry_b, llm, Arc::new(FixedTime), b"key-b".to_vec());

        let raw = RawFinding {
            finding_type: "open_port".to_string(),
            severity: "info".to_string(),
            description: "d".to_string(),
            evidence: "22/tcp open".to_string(),
        };
        let c = ctx("nmap", "");
        let finding_a = a.mint(&raw, &c).unwrap();
        let finding_b = b.mint(&raw, &c).unwrap();
        assert_ne!(finding_a.signature, finding_b.signature);
    }
}
