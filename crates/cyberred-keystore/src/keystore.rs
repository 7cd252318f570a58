//! High-level keystore wrapping key derivation and AES-256-GCM operations.

use zeroize::Zeroizing;

use crate::crypto::{decrypt, derive_key, encrypt, EncryptionResult, DEFAULT_ITERATIONS, KEY_LENGTH};
use crate::error::KeystoreError;

pub struct Keystore {
    key: Option<Zeroizing<[u8; KEY_LENGTH]>>,
}

impl Keystore {
    pub fn from_key(key: [u8; KEY_LENGTH]) -> Self {
        Self {
            key: Some(Zeroizing::new(key)),
        }
    }

    pub fn from_password(password: &str, salt: &[u8]) -> Result<Self, KeystoreError> {
        let key = derive_key(password, salt, DEFAULT_ITERATIONS)?;
        Ok(Self::from_key(key))
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptionResult, KeystoreError> {
        let key = self.key.as_ref().ok_or(KeystoreError::Closed)?;
        encrypt(plaintext, key)
    }

    pub fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        let key = self.key.as_ref().ok_or(KeystoreError::Closed)?;
        decrypt(ciphertext, key, nonce)
    }

    /// Drop the key reference and zeroize its backing memory. Unlike the
    /// Python original (which relies on GC to eventually reclaim the
    /// bytes), `Zeroizing` guarantees the buffer is wiped the moment it's
    /// dropped here.
    pub fn clear(&mut self) {
        self.key = None;
    }

    pub fn is_cleared(&self) -> bool {
        self.key.is_none()
    }
}
