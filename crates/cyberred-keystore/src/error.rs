use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeystoreError {
    #[error("password cannot be empty")]
    EmptyPassword,

    #[error("salt cannot be empty")]
    EmptySalt,

    #[error("decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    #[error("keystore is closed/cleared")]
    Closed,

    #[error("certificate error: {reason}")]
    Certificate { reason: String },
}
