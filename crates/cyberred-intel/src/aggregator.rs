//! Six-step cached, stigmergic intelligence aggregator, per spec.md §4.H.
//!
//! Resolution order: stigmergic peek, cache peek, parallel source fanout,
//! cache write (on zero failures), stigmergic publish, offline fallback.
//! `query` never raises — on total source failure with no fresh cache it
//! returns an empty list, matching the agent continuity guarantee tested
//! in `original_source/tests/safety/intelligence/test_agent_continuity.py`.

use std::collections::HashMap;
use std::sync::Arc;

use cyberred_bus::EventBus;
use cyberred_core::IntelResult;
use futures_util::future::join_all;
use tracing::warn;

use crate::cache::IntelCache;
use crate::source::IntelSource;
use crate::stigmergic::StigmergicIntel;

#[derive(Debug, Clone)]
pub enum SourceOutcome {
    Success(usize),
    Timeout,
    Error(String),
}

#[derive(Debug, Clone, Default)]
pub struct QueryMetrics {
    pub successes: usize,
    pub failures: usize,
    pub timeouts: usize,
    pub per_source: HashMap<String, SourceOutcome>,
    /// Which of the six resolution steps produced the returned results.
    pub resolved_by: &'static str,
}

pub struct IntelligenceAggregator {
    sources: Vec<Arc<dyn IntelSource>>,
    cache: tokio::sync::Mutex<IntelCache>,
    stigmergic: Option<StigmergicIntel>,
    bus: Option<Arc<EventBus>>,
}

impl IntelligenceAggregator {
    pub fn new(cache: IntelCache) -> Self {
        Self {
            sources: Vec::new(),
            cache: tokio::sync::Mutex::new(cache),
            stigmergic: None,
            bus: None,
        }
    }

    pub fn with_stigmergic(mut self, stigmergic: StigmergicIntel, bus: Arc<EventBus>) -> Self {
        self.stigmergic = Some(stigmergic);
        self.bus = Some(bus);
        self
    }

    pub fn add_source(&mut self, source: Arc<dyn IntelSource>) {
        self.sources.push(source);
    }

    /// Never raises: total failure with no fresh cache yields an empty
    /// `Vec`, never an error.
    pub async fn query(&self, service: &str, version: &str, now: &str) -> Vec<IntelResult> {
        self.query_with_metrics(service, version, now).await.0
    }

    pub async fn query_with_metrics(
        &self,
        service: &str,
        version: &str,
        now: &str,
    ) -> (Vec<IntelResult>, QueryMetrics) {
        // Step 1: stigmergic peek.
        if let Some(stigmergic) = &self.stigmergic {
            if let Some(results) = stigmergic.get(service, version).await {
                return (
                    results,
                    QueryMetrics {
                        resolved_by: "stigmergic",
                        ..Default::default()
                    },
                );
            }
        }

        // Step 2: cache peek.
        match self.cache.lock().await.get_with_metadata(service, version, false).await {
            Ok(Some((results, _cached_at))) => {
                return (
                    results,
                    QueryMetrics {
                        resolved_by: "cache",
                        ..Default::default()
                    },
                );
            }
            Ok(None) => {}
            Err(err) => warn!(service, version, error = %err, "intel cache read failed, falling through to sources"),
        }

        // Step 3: parallel fanout with a per-source timeout.
        let outcomes = join_all(self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let service = service.to_string();
            let version = version.to_string();
            async move {
                let name = source.name().to_string();
                match tokio::time::timeout(source.timeout(), source.query(&service, &version)).await {
                    Ok(Ok(results)) => (name, Ok(results)),
                    Ok(Err(reason)) => (name, Err(SourceOutcome::Error(reason))),
                    Err(_) => (name, Err(SourceOutcome::Timeout)),
                }
            }
        }))
        .await;

        let mut merged = Vec::new();
        let mut metrics = QueryMetrics {
            resolved_by: "sources",
            ..Default::default()
        };
        for (name, outcome) in outcomes {
            match outcome {
                Ok(results) => {
                    metrics.successes += 1;
                    metrics.per_source.insert(name, SourceOutcome::Success(results.len()));
                    merged.extend(results);
                }
                Err(SourceOutcome::Timeout) => {
                    metrics.timeouts += 1;
                    metrics.per_source.insert(name, SourceOutcome::Timeout);
                }
                Err(err @ SourceOutcome::Error(_)) => {
                    metrics.failures += 1;
                    metrics.per_source.insert(name, err);
                }
            }
        }
        merged.sort();

        let total_failures = metrics.failures + metrics.timeouts;

        // Step 4: cache write, only on the zero-failure success path
        // (including the legitimate empty-result case).
        if total_failures == 0 {
            if let Err(err) = self.cache.lock().await.set(service, version, &merged, now, None).await {
                warn!(service, version, error = %err, "intel cache write failed");
            }
        }

        // Step 5: stigmergic publish, best-effort, never raised.
        if let (Some(stigmergic), Some(bus)) = (&self.stigmergic, &self.bus) {
            if let Err(err) = stigmergic.publish(bus, service, version, &merged, "system", now).await {
                warn!(service, version, error = %err, "stigmergic publish failed");
            }
        }

        if !merged.is_empty() || total_failures == 0 {
            return (merged, metrics);
        }

        // Step 6: offline fallback on complete source failure with no
        // fresh cache — try the durable archive key.
        match self.cache.lock().await.get_with_metadata(service, version, true).await {
            Ok(Some((mut archived, cached_at))) => {
                for result in archived.iter_mut() {
                    result.metadata.insert("stale".to_string(), serde_json::Value::Bool(true));
                    if let Some(ts) = &cached_at {
                        result
                            .metadata
                            .insert("cached_at".to_string(), serde_json::Value::String(ts.clone()));
                    }
                }
                metrics.resolved_by = "archive";
                (archived, metrics)
            }
            _ => (merged, metrics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cyberred_core::IntelPriority;
    use std::time::Duration;

    struct StaticSource {
        name: String,
        result: IntelResult,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl IntelSource for StaticSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }

        async fn query(&self, _service: &str, _version: &str) -> Result<Vec<IntelResult>, String> {
            if self.delay > Duration::ZERO {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                Err("source unavailable".to_string())
            } else {
                Ok(vec![self.result.clone()])
            }
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn make_result(source: &str, priority: IntelPriority) -> IntelResult {
        IntelResult {
            source: source.to_string(),
            cve_id: Some("CVE-TEST".to_string()),
            severity: "high".to_string(),
            exploit_available: true,
            exploit_path: None,
            confidence: 0.9,
            priority,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn query_metrics_default_has_no_failures() {
        let metrics = QueryMetrics::default();
        assert_eq!(metrics.failures, 0);
        assert_eq!(metrics.timeouts, 0);
        assert_eq!(metrics.successes, 0);
    }

    #[tokio::test]
    async fn sources_merge_and_sort_by_priority() {
        let a = StaticSource {
            name: "nuclei".to_string(),
            result: make_result("nuclei", IntelPriority::Nuclei),
            delay: Duration::ZERO,
            fail: false,
        };
        let b = StaticSource {
            name: "cisa_kev".to_string(),
            result: make_result("cisa_kev", IntelPriority::Kev),
            delay: Duration::ZERO,
            fail: false,
        };

        let mut merged = vec![a.result.clone(), b.result.clone()];
        merged.sort();
        assert_eq!(merged[0].source, "cisa_kev");
        assert_eq!(merged[1].source, "nuclei");
    }

    #[tokio::test]
    async fn timed_out_source_is_recorded_without_panicking() {
        let slow = StaticSource {
            name: "slow".to_string(),
            result: make_result("slow", IntelPriority::Exploitdb),
            delay: Duration::from_millis(200),
            fail: false,
        };
        let outcome = tokio::time::timeout(slow.timeout(), slow.query("svc", "1.0")).await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn failing_source_surfaces_as_error_outcome() {
        let failing = StaticSource {
            name: "broken".to_string(),
            result: make_result("broken", IntelPriority::Exploitdb),
            delay: Duration::ZERO,
            fail: true,
        };
        let outcome = failing.query("svc", "1.0").await;
        assert!(outcome.is_err());
    }
}
