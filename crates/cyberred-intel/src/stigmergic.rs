//! Stigmergic intelligence sharing: agents publish query results to
//! `findings:{sha256(service:version)[:8]}:intel_enriched` so other agents
//! can skip redundant queries, ported from
//! `original_source/src/cyberred/intelligence/stigmergic.py`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cyberred_bus::{intel_topic, EventBus, STIGMERGIC_TTL_SECS};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use cyberred_core::IntelResult;

use crate::error::IntelError;

#[derive(Debug, Serialize, Deserialize)]
struct StigmergicPayload {
    service: String,
    version: String,
    results: Vec<IntelResult>,
    timestamp: String,
    ttl_seconds: u64,
    source_agent_id: String,
}

struct CachedEntry {
    results: Vec<IntelResult>,
    expires_at: Instant,
}

fn local_key(service: &str, version: &str) -> String {
    format!("{}:{}", service.to_lowercase(), version.to_lowercase())
}

/// Publish side and a local subscriber-populated cache, combined because
/// both share the same topic-naming convention.
#[derive(Clone)]
pub struct StigmergicIntel {
    local: Arc<Mutex<HashMap<String, CachedEntry>>>,
}

impl Default for StigmergicIntel {
    fn default() -> Self {
        Self::new()
    }
}

impl StigmergicIntel {
    pub fn new() -> Self {
        Self {
            local: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Non-expired local hit, if any. Expired entries are evicted on read.
    pub async fn get(&self, service: &str, version: &str) -> Option<Vec<IntelResult>> {
        let key = local_key(service, version);
        let mut guard = self.local.lock().await;
        match guard.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.results.clone()),
            Some(_) => {
                guard.remove(&key);
                None
            }
            None => None,
        }
    }

    pub async fn publish(
        &self,
        bus: &EventBus,
        service: &str,
        version: &str,
        results: &[IntelResult],
        agent_id: &str,
        timestamp: &str,
    ) -> Result<(), IntelError> {
        let topic = intel_topic(service, version);
        let payload = StigmergicPayload {
            service: service.to_string(),
            version: version.to_string(),
            results: results.to_vec(),
            timestamp: timestamp.to_string(),
            ttl_seconds: STIGMERGIC_TTL_SECS,
            source_agent_id: agent_id.to_string(),
        };
        let value = serde_json::to_value(&payload).expect("payload always serializes");
        let subscribers = bus.publish(&topic, value, timestamp).await?;
        info!(service, version, result_count = results.len(), subscribers, "intel published to stigmergic layer");
        Ok(())
    }

    /// Drive a background subscriber loop populating the local cache from
    /// other agents' publishes. Intended to be spawned once at startup.
    pub async fn run_subscriber(self, bus: Arc<EventBus>, key: Vec<u8>) {
        let subscription = match bus.subscribe("findings:*:intel_enriched", key).await {
            Ok(sub) => sub,
            Err(err) => {
                warn!(error = %err, "failed to subscribe to stigmergic intel topic");
                return;
            }
        };
        let mut receiver = subscription.receiver;
        while let Some(delivery) = receiver.recv().await {
            let Ok(payload) = serde_json::from_value::<StigmergicPayload>(delivery.payload) else {
                continue;
            };
            let key = local_key(&payload.service, &payload.version);
            let expires_at = Instant::now() + Duration::from_secs(payload.ttl_seconds);
            debug!(
                service = payload.service,
                version = payload.version,
                result_count = payload.results.len(),
                source_agent = payload.source_agent_id,
                "intel received via stigmergic layer"
            );
            self.local.lock().await.insert(
                key,
                CachedEntry {
                    results: payload.results,
                    expires_at,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> IntelResult {
        IntelResult {
            source: "cisa_kev".to_string(),
            cve_id: Some("CVE-2021-44228".to_string()),
            severity: "critical".to_string(),
            exploit_available: true,
            exploit_path: None,
            confidence: 1.0,
            priority: cyberred_core::IntelPriority::Kev,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn local_cache_miss_before_any_publish_received() {
        let stigmergic = StigmergicIntel::new();
        assert!(stigmergic.get("Apache", "2.4.49").await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_evicted_on_read() {
        let stigmergic = StigmergicIntel::new();
        let key = local_key("Apache", "2.4.49");
        stigmergic.local.lock().await.insert(
            key,
            CachedEntry {
                results: vec![sample_result()],
                expires_at: Instant::now() - Duration::from_secs(1),
            },
        );
        assert!(stigmergic.get("Apache", "2.4.49").await.is_none());
    }

    #[tokio::test]
    async fn live_entries_are_returned() {
        let stigmergic = StigmergicIntel::new();
        let key = local_key("Apache", "2.4.49");
        stigmergic.local.lock().await.insert(
            key,
            CachedEntry {
                results: vec![sample_result()],
                expires_at: Instant::now() + Duration::from_secs(60),
            },
        );
        let results = stigmergic.get("Apache", "2.4.49").await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
