//! Embedded certificate authority for mTLS between the daemon and its
//! sandboxed tool-executor containers.

use rcgen::{BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};
use time::{Duration, OffsetDateTime};

use crate::error::KeystoreError;

/// Leaf certificates must outlive this threshold to be considered usable
/// for a new mTLS handshake (spec: "expiry must exceed a 24-hour
/// threshold when used").
pub const MIN_REMAINING_VALIDITY: Duration = Duration::hours(24);

pub struct IssuedCertificate {
    pub certificate_pem: String,
    pub private_key_pem: String,
    pub not_after: OffsetDateTime,
}

pub struct CertificateAuthority {
    cert: Certificate,
    key_pair: KeyPair,
}

impl CertificateAuthority {
    /// Generate a fresh self-signed root, valid for ten years.
    pub fn generate(common_name: &str) -> Result<Self, KeystoreError> {
        let key_pair = KeyPair::generate().map_err(|e| KeystoreError::Certificate {
            reason: e.to_string(),
        })?;

        let mut params = CertificateParams::new(Vec::<String>::new()).map_err(|e| {
            KeystoreError::Certificate {
                reason: e.to_string(),
            }
        })?;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.not_before = OffsetDateTime::now_utc();
        params.not_after = OffsetDateTime::now_utc() + Duration::days(3650);
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        params.distinguished_name = dn;

        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| KeystoreError::Certificate {
                reason: e.to_string(),
            })?;

        Ok(Self { cert, key_pair })
    }

    pub fn root_certificate_pem(&self) -> String {
        self.cert.pem()
    }

    /// Issue a leaf certificate for `common_name` with the given SANs,
    /// valid for 90 days from now.
    pub fn issue_leaf(
        &self,
        common_name: &str,
        sans: Vec<String>,
    ) -> Result<IssuedCertificate, KeystoreError> {
        let leaf_key = KeyPair::generate().map_err(|e| KeystoreError::Certificate {
            reason: e.to_string(),
        })?;

        let mut params = CertificateParams::new(sans).map_err(|e| KeystoreError::Certificate {
            reason: e.to_string(),
        })?;
        let not_before = OffsetDateTime::now_utc();
        let not_after = not_before + Duration::days(90);
        params.not_before = not_before;
        params.not_after = not_after;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        params.distinguished_name = dn;

        let leaf_cert = params
            .signed_by(&leaf_key, &self.cert, &self.key_pair)
            .map_err(|e| KeystoreError::Certificate {
                reason: e.to_string(),
            })?;

        Ok(IssuedCertificate {
            certificate_pem: leaf_cert.pem(),
            private_key_pem: leaf_key.serialize_pem(),
            not_after,
        })
    }
}

/// Returns true when `not_after` still has at least [`MIN_REMAINING_VALIDITY`]
/// of headroom from now.
pub fn has_sufficient_validity(not_after: OffsetDateTime) -> bool {
    not_after - OffsetDateTime::now_utc() > MIN_REMAINING_VALIDITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_leaf_signed_by_root() {
        let ca = CertificateAuthority::generate("cyberred-root").unwrap();
        let leaf = ca
            .issue_leaf("tool-executor", vec!["tool-executor.cyberred.local".to_string()])
            .unwrap();
        assert!(leaf.certificate_pem.contains("BEGIN CERTIFICATE"));
        assert!(leaf.private_key_pem.contains("PRIVATE KEY"));
        assert!(has_sufficient_validity(leaf.not_after));
    }

    #[test]
    fn expiring_certificate_is_rejected() {
        let soon = OffsetDateTime::now_utc() + Duration::hours(1);
        assert!(!has_sufficient_validity(soon));
    }
}
