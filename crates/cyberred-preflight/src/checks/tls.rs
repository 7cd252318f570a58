//! TLS certificate validity check, delegating the remaining-validity
//! comparison to `cyberred-keystore`'s CA store (>= 24h remaining).

use async_trait::async_trait;
use cyberred_keystore::ca::has_sufficient_validity;
use time::OffsetDateTime;

use crate::check::{CheckResult, PreflightCheck, Priority};

pub struct TlsCertificateCheck {
    /// `None` means mTLS/C2 isn't enabled for this engagement, so the
    /// check is skipped (passes trivially) rather than failing closed on
    /// an absent certificate.
    not_after: Option<OffsetDateTime>,
}

impl TlsCertificateCheck {
    pub fn new(not_after: Option<OffsetDateTime>) -> Self {
        Self { not_after }
    }
}

#[async_trait]
impl PreflightCheck for TlsCertificateCheck {
    fn name(&self) -> &str {
        "tls_certificate_validity"
    }

    fn priority(&self) -> Priority {
        Priority::P1
    }

    async fn execute(&self) -> CheckResult {
        match self.not_after {
            None => CheckResult::pass(self.name(), self.priority(), "C2/mTLS not enabled"),
            Some(not_after) if has_sufficient_validity(not_after) => {
                CheckResult::pass(self.name(), self.priority(), "certificate has sufficient validity")
            }
            Some(not_after) => CheckResult::warn(
                self.name(),
                self.priority(),
                format!("certificate expires {not_after}, below the 24h threshold"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckStatus;
    use time::Duration;

    #[tokio::test]
    async fn disabled_c2_passes() {
        let check = TlsCertificateCheck::new(None);
        assert_eq!(check.execute().await.status, CheckStatus::Pass);
    }

    #[tokio::test]
    async fn expiring_soon_warns() {
        let check = TlsCertificateCheck::new(Some(OffsetDateTime::now_utc() + Duration::hours(1)));
        assert_eq!(check.execute().await.status, CheckStatus::Warn);
    }

    #[tokio::test]
    async fn long_lived_cert_passes() {
        let check = TlsCertificateCheck::new(Some(OffsetDateTime::now_utc() + Duration::days(30)));
        assert_eq!(check.execute().await.status, CheckStatus::Pass);
    }
}
