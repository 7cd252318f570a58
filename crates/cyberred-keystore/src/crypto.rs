//! Low-level key derivation and AES-256-GCM primitives.
//!
//! Grounded on `original_source/src/cyberred/core/keystore.py`'s module
//! functions (`generate_salt`, `derive_key`, `encrypt`, `decrypt`).

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::error::KeystoreError;

pub const DEFAULT_ITERATIONS: u32 = 600_000;
pub const KEY_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;
pub const NONCE_LENGTH: usize = 12;

pub fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

pub fn derive_key(
    password: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<[u8; KEY_LENGTH], KeystoreError> {
    if password.is_empty() {
        return Err(KeystoreError::EmptyPassword);
    }
    if salt.is_empty() {
        return Err(KeystoreError::EmptySalt);
    }
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    Ok(key)
}

pub struct EncryptionResult {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LENGTH],
}

pub fn encrypt(plaintext: &[u8], key: &[u8; KEY_LENGTH]) -> Result<EncryptionResult, KeystoreError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| KeystoreError::DecryptionFailed {
            reason: format!("encryption failed: {e}"),
        })?;
    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    nonce_bytes.copy_from_slice(nonce.as_slice());
    Ok(EncryptionResult {
        ciphertext,
        nonce: nonce_bytes,
    })
}

pub fn decrypt(
    ciphertext: &[u8],
    key: &[u8; KEY_LENGTH],
    nonce: &[u8],
) -> Result<Vec<u8>, KeystoreError> {
    if nonce.len() != NONCE_LENGTH {
        return Err(KeystoreError::DecryptionFailed {
            reason: format!("invalid nonce length: expected {NONCE_LENGTH}, got {}", nonce.len()),
        });
    }
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| KeystoreError::DecryptionFailed {
            reason: "invalid tag (wrong key or tampered data)".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [7u8; SALT_LENGTH];
        let a = derive_key("hunter2", &salt, 10_000).unwrap();
        let b = derive_key("hunter2", &salt, 10_000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn derive_key_rejects_empty_password() {
        let salt = generate_salt();
        assert!(matches!(
            derive_key("", &salt, 10_000),
            Err(KeystoreError::EmptyPassword)
        ));
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = derive_key("hunter2", &generate_salt(), 10_000).unwrap();
        let result = encrypt(b"authorized scope: 192.0.2.0/24", &key).unwrap();
        let plaintext = decrypt(&result.ciphertext, &key, &result.nonce).unwrap();
        assert_eq!(plaintext, b"authorized scope: 192.0.2.0/24");
    }

    #[test]
    fn decrypt_fails_with_wrong_key() {
        let key_a = derive_key("hunter2", &generate_salt(), 10_000).unwrap();
        let key_b = derive_key("other-password", &generate_salt(), 10_000).unwrap();
        let result = encrypt(b"secret", &key_a).unwrap();
        assert!(decrypt(&result.ciphertext, &key_b, &result.nonce).is_err());
    }

    #[test]
    fn decrypt_fails_on_tampered_ciphertext() {
        let key = derive_key("hunter2", &generate_salt(), 10_000).unwrap();
        let mut result = encrypt(b"secret", &key).unwrap();
        let last = result.ciphertext.len() - 1;
        result.ciphertext[last] ^= 0xFF;
        assert!(decrypt(&result.ciphertext, &key, &result.nonce).is_err());
    }
}
