//! Minimal Sentinel master discovery.
//!
//! Queries each configured sentinel in turn with `SENTINEL
//! get-master-addr-by-name <service>` until one answers, matching the
//! "master discovery via a set of sentinel endpoints" contract in spec.md
//! §4.D. The `redis` crate's own `sentinel` module (when present) wraps
//! the same command; this thin wrapper is kept explicit so the retry/
//! failover ordering used by [`crate::EventBus`] is visible in one place.

use redis::Client;
use tracing::warn;

use crate::error::BusError;

pub struct SentinelConfig {
    pub sentinel_addrs: Vec<String>,
    pub service_name: String,
}

pub async fn resolve_master(config: &SentinelConfig) -> Result<(String, u16), BusError> {
    for addr in &config.sentinel_addrs {
        match try_sentinel(addr, &config.service_name).await {
            Ok(master) => return Ok(master),
            Err(err) => {
                warn!(sentinel = %addr, error = %err, "sentinel unreachable, trying next");
            }
        }
    }
    Err(BusError::SentinelDiscoveryFailed {
        service: config.service_name.clone(),
    })
}

async fn try_sentinel(addr: &str, service_name: &str) -> Result<(String, u16), BusError> {
    let client = Client::open(format!("redis://{addr}"))?;
    let mut conn = client.get_multiplexed_async_connection().await?;
    let (host, port): (String, u16) = redis::cmd("SENTINEL")
        .arg("get-master-addr-by-name")
        .arg(service_name)
        .query_async(&mut conn)
        .await?;
    Ok((host, port))
}
