//! Master-key derivation, authenticated encryption, and an embedded
//! certificate authority for mTLS between daemon and sandboxed agents.
//!
//! Grounded on `original_source/src/cyberred/core/keystore.py`.

pub mod ca;
pub mod crypto;
pub mod error;
pub mod keystore;

pub use ca::{CertificateAuthority, IssuedCertificate};
pub use crypto::{generate_salt, DEFAULT_ITERATIONS, KEY_LENGTH, NONCE_LENGTH, SALT_LENGTH};
pub use error::KeystoreError;
pub use keystore::Keystore;
