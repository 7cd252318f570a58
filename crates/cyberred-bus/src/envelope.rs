//! Authenticated message envelope: every publish carries
//! `signature = HMAC(engagement_key, canonical_payload)`; subscribers drop
//! anything that doesn't verify, so a raw publish that bypasses this
//! envelope is silently ignored rather than accepted.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cyberred_core::StigmergicMessage;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn seal(
    payload: serde_json::Value,
    engagement_id: &str,
    key: &[u8],
    timestamp: &str,
) -> Result<StigmergicMessage, serde_json::Error> {
    let canonical = serde_json::to_vec(&payload)?;
    let signature = sign(&canonical, key);
    Ok(StigmergicMessage {
        payload,
        signature,
        timestamp: timestamp.to_string(),
        engagement_id: engagement_id.to_string(),
    })
}

pub fn verify(message: &StigmergicMessage, key: &[u8]) -> bool {
    let Ok(canonical) = serde_json::to_vec(&message.payload) else {
        return false;
    };
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(&canonical);
    let Ok(given) = BASE64.decode(&message.signature) else {
        return false;
    };
    mac.verify_slice(&given).is_ok()
}

fn sign(payload: &[u8], key: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(payload);
    BASE64.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seal_and_verify_round_trip() {
        let key = b"engagement-key";
        let payload = json!({"type": "sqli", "severity": "critical"});
        let message = seal(payload, "engagement-1", key, "2025-12-27T23:30:00Z").unwrap();
        assert!(verify(&message, key));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let key = b"engagement-key";
        let payload = json!({"type": "sqli"});
        let mut message = seal(payload, "engagement-1", key, "2025-12-27T23:30:00Z").unwrap();
        message.payload = json!({"type": "xss"});
        assert!(!verify(&message, key));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let payload = json!({"type": "sqli"});
        let message = seal(payload, "engagement-1", b"key-a", "2025-12-27T23:30:00Z").unwrap();
        assert!(!verify(&message, b"key-b"));
    }
}
