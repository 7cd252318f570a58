//! NTP-synchronized time provider with drift detection.
//!
//! Provides cryptographically verifiable timestamps for audit trails.
//! Falls back to local system time with a warning if NTP is unreachable.
//! A background task maintains synchronization so `now()` never blocks the
//! caller (grounded on `original_source/src/cyberred/core/time.py`).

pub mod error;
mod ntp;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

pub use error::TimeError;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_NTP_SERVER: &str = "pool.ntp.org";
const DEFAULT_SYNC_TTL_SECS: u64 = 300;
const DEFAULT_DRIFT_WARN_SECS: f64 = 1.0;
const DEFAULT_DRIFT_ERROR_SECS: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct TrustedTimeConfig {
    pub ntp_server: String,
    pub sync_ttl_secs: u64,
    pub drift_warn_threshold: f64,
    pub drift_error_threshold: f64,
}

impl Default for TrustedTimeConfig {
    fn default() -> Self {
        Self {
            ntp_server: DEFAULT_NTP_SERVER.to_string(),
            sync_ttl_secs: DEFAULT_SYNC_TTL_SECS,
            drift_warn_threshold: DEFAULT_DRIFT_WARN_SECS,
            drift_error_threshold: DEFAULT_DRIFT_ERROR_SECS,
        }
    }
}

struct SyncState {
    /// Current offset in seconds, stored as its IEEE-754 bit pattern so it
    /// can be read/written without a lock from the hot `now()` path.
    offset_bits: AtomicU64,
    is_synced: AtomicBool,
}

impl SyncState {
    fn offset(&self) -> f64 {
        f64::from_bits(self.offset_bits.load(Ordering::Relaxed))
    }

    fn set_offset(&self, value: f64) {
        self.offset_bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// NTP-synchronized, non-blocking time provider.
pub struct TrustedTime {
    config: TrustedTimeConfig,
    state: Arc<SyncState>,
    sync_task: JoinHandle<()>,
}

impl TrustedTime {
    /// Spawn a `TrustedTime` with a background sync loop on the current
    /// Tokio runtime. Must be called from within a Tokio context.
    pub fn spawn(config: TrustedTimeConfig) -> Self {
        let state = Arc::new(SyncState {
            offset_bits: AtomicU64::new(0.0_f64.to_bits()),
            is_synced: AtomicBool::new(false),
        });

        let loop_state = state.clone();
        let loop_config = config.clone();
        let sync_task = tokio::spawn(async move {
            run_sync_loop(loop_config, loop_state).await;
        });

        Self {
            config,
            state,
            sync_task,
        }
    }

    /// Return the current NTP-adjusted timestamp in RFC 3339 form. Never
    /// blocks — reads the latest cached offset.
    pub fn now(&self) -> String {
        let offset = self.state.offset();
        let local = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        let adjusted = local + offset;
        let secs = adjusted.trunc() as i64;
        let nanos = (adjusted.fract() * 1_000_000_000.0).round() as u32;
        let dt: DateTime<Utc> = DateTime::from_timestamp(secs, nanos).unwrap_or_else(Utc::now);
        dt.to_rfc3339()
    }

    pub fn is_synced(&self) -> bool {
        self.state.is_synced.load(Ordering::Relaxed)
    }

    pub fn drift(&self) -> f64 {
        self.state.offset()
    }

    pub fn sign_timestamp(&self, timestamp: &str, key: &[u8]) -> String {
        sign_timestamp(timestamp, key)
    }

    pub fn verify_timestamp_signature(&self, timestamp: &str, signature: &str, key: &[u8]) -> bool {
        verify_timestamp_signature(timestamp, signature, key)
    }

    pub fn stop(&self) {
        self.sync_task.abort();
    }

    pub fn config(&self) -> &TrustedTimeConfig {
        &self.config
    }
}

impl Drop for TrustedTime {
    fn drop(&mut self) {
        self.sync_task.abort();
    }
}

async fn run_sync_loop(config: TrustedTimeConfig, state: Arc<SyncState>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(config.sync_ttl_secs));
    // First tick fires immediately; the original performs an initial sync
    // before entering its periodic wait.
    loop {
        interval.tick().await;
        sync_once(&config, &state).await;
    }
}

async fn sync_once(config: &TrustedTimeConfig, state: &Arc<SyncState>) {
    match ntp::query(&config.ntp_server).await {
        Ok(sample) => {
            state.set_offset(sample.offset_secs);
            state.is_synced.store(true, Ordering::Relaxed);

            let abs_offset = sample.offset_secs.abs();
            if abs_offset > config.drift_error_threshold {
                error!(offset = sample.offset_secs, "severe clock drift detected from NTP");
            } else if abs_offset > config.drift_warn_threshold {
                warn!(offset = sample.offset_secs, "clock drift detected from NTP");
            } else {
                debug!(offset = sample.offset_secs, "NTP sync successful");
            }
        }
        Err(err) => {
            warn!(error = %err, "NTP sync failed, falling back to last known offset");
            state.is_synced.store(false, Ordering::Relaxed);
            // Deliberately not reset to 0.0 — the last-known offset is kept
            // until a successful re-sync, matching the Python original.
        }
    }
}

pub fn sign_timestamp(timestamp: &str, key: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(timestamp.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

pub fn verify_timestamp_signature(timestamp: &str, signature: &str, key: &[u8]) -> bool {
    // Constant-time comparison via the MAC crate's own verify, not string
    // equality, to avoid a timing side channel on the signature check.
    let Ok(decoded) = BASE64.decode(signature) else {
        return false;
    };
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(timestamp.as_bytes());
    mac.verify_slice(&decoded).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let key = b"engagement-scoped-key";
        let ts = "2025-12-27T23:30:00+00:00";
        let sig = sign_timestamp(ts, key);
        assert!(verify_timestamp_signature(ts, &sig, key));
    }

    #[test]
    fn verify_rejects_tampered_timestamp() {
        let key = b"engagement-scoped-key";
        let ts = "2025-12-27T23:30:00+00:00";
        let sig = sign_timestamp(ts, key);
        assert!(!verify_timestamp_signature("2025-12-27T23:30:01+00:00", &sig, key));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let ts = "2025-12-27T23:30:00+00:00";
        let sig = sign_timestamp(ts, b"key-a");
        assert!(!verify_timestamp_signature(ts, &sig, b"key-b"));
    }
}
