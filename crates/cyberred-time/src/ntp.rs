//! Minimal SNTP v3 client.
//!
//! No crate in the example pack provides an NTP/SNTP client (see
//! DESIGN.md), so the wire protocol is implemented directly over
//! `tokio::net::UdpSocket` — the packet format is small and fixed (RFC
//! 4330 client mode), and the only thing we need out of a response is the
//! clock offset.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::error::TimeError;

const NTP_PACKET_SIZE: usize = 48;
/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch.
const NTP_UNIX_EPOCH_DELTA: u64 = 2_208_988_800;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of one successful SNTP round trip: clock offset in seconds
/// (positive means the local clock is behind the server).
pub struct NtpSample {
    pub offset_secs: f64,
}

fn now_as_ntp_timestamp() -> [u8; 8] {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = since_epoch.as_secs() + NTP_UNIX_EPOCH_DELTA;
    let frac = ((since_epoch.subsec_nanos() as u64) << 32) / 1_000_000_000;
    let mut buf = [0u8; 8];
    buf[0..4].copy_from_slice(&(secs as u32).to_be_bytes());
    buf[4..8].copy_from_slice(&(frac as u32).to_be_bytes());
    buf
}

fn ntp_timestamp_to_secs(buf: &[u8]) -> f64 {
    let secs = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as u64;
    let frac = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as f64;
    (secs.saturating_sub(NTP_UNIX_EPOCH_DELTA)) as f64 + (frac / (u32::MAX as f64 + 1.0))
}

/// Send a single SNTP request and compute the clock offset against
/// `server:123` using the standard two-way offset formula:
/// `offset = ((T2 - T1) + (T3 - T4)) / 2`.
pub async fn query(server: &str) -> Result<NtpSample, TimeError> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect((server, 123u16)).await?;

    let mut request = [0u8; NTP_PACKET_SIZE];
    request[0] = 0x1B; // LI=0, VN=3, Mode=3 (client)
    let t1_wire = now_as_ntp_timestamp();
    request[40..48].copy_from_slice(&t1_wire);
    let t1 = ntp_timestamp_to_secs(&t1_wire);

    timeout(REQUEST_TIMEOUT, socket.send(&request)).await??;

    let mut response = [0u8; NTP_PACKET_SIZE];
    let len = timeout(REQUEST_TIMEOUT, socket.recv(&mut response)).await??;
    let t4 = ntp_timestamp_to_secs(&now_as_ntp_timestamp());

    if len < NTP_PACKET_SIZE {
        return Err(TimeError::MalformedResponse {
            reason: format!("short response: {len} bytes"),
        });
    }

    let stratum = response[1];
    if stratum == 0 {
        return Err(TimeError::MalformedResponse {
            reason: "kiss-of-death response (stratum 0)".to_string(),
        });
    }

    let t2 = ntp_timestamp_to_secs(&response[32..40]);
    let t3 = ntp_timestamp_to_secs(&response[40..48]);

    let offset_secs = ((t2 - t1) + (t3 - t4)) / 2.0;
    Ok(NtpSample { offset_secs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntp_timestamp_roundtrips_through_wire_format() {
        let wire = now_as_ntp_timestamp();
        let secs = ntp_timestamp_to_secs(&wire);
        let now_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs_f64();
        assert!((secs - now_unix).abs() < 1.0);
    }
}
