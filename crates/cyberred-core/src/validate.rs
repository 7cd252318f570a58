//! Field validators shared by the data model types.
//!
//! Mirrors the validation order of the Python original: empty/whitespace
//! check, then IP address, then URL scheme, then hostname grammar.

use std::net::IpAddr;
use std::str::FromStr;

use crate::error::CyberRedError;

pub const VALID_SEVERITIES: &[&str] = &["critical", "high", "medium", "low", "info"];

pub fn validate_severity(value: &str) -> Result<(), CyberRedError> {
    if VALID_SEVERITIES.contains(&value) {
        Ok(())
    } else {
        Err(CyberRedError::Validation {
            field: "severity".to_string(),
            reason: format!(
                "invalid severity '{value}', must be one of: {}",
                VALID_SEVERITIES.join(", ")
            ),
        })
    }
}

pub fn validate_uuid(value: &str, field_name: &str) -> Result<(), CyberRedError> {
    uuid::Uuid::parse_str(value).map(|_| ()).map_err(|_| CyberRedError::Validation {
        field: field_name.to_string(),
        reason: format!("invalid UUID format: '{value}'"),
    })
}

pub fn validate_timestamp(value: &str, field_name: &str) -> Result<(), CyberRedError> {
    let normalized = value.replacen('Z', "+00:00", 1);
    chrono::DateTime::parse_from_rfc3339(&normalized)
        .map(|_| ())
        .map_err(|_| CyberRedError::Validation {
            field: field_name.to_string(),
            reason: format!("invalid ISO 8601 timestamp: '{value}'"),
        })
}

fn is_hostname(value: &str) -> bool {
    let label = |s: &str| -> bool {
        if s.is_empty() || s.len() > 63 {
            return false;
        }
        let chars: Vec<char> = s.chars().collect();
        let alnum_hyphen = chars.iter().all(|c| c.is_ascii_alphanumeric() || *c == '-');
        alnum_hyphen
            && chars.first().is_some_and(char::is_ascii_alphanumeric)
            && chars.last().is_some_and(char::is_ascii_alphanumeric)
    };
    !value.is_empty() && value.split('.').all(label)
}

fn is_scheme_url(value: &str) -> bool {
    const SCHEMES: &[&str] = &["https://", "http://", "ftp://", "ssh://", "ws://"];
    SCHEMES
        .iter()
        .any(|scheme| value.starts_with(scheme) && value.len() > scheme.len())
}

pub fn validate_target(value: &str, field_name: &str) -> Result<(), CyberRedError> {
    if value.trim().is_empty() {
        return Err(CyberRedError::Validation {
            field: field_name.to_string(),
            reason: "field cannot be empty".to_string(),
        });
    }
    if value.chars().any(char::is_whitespace) {
        return Err(CyberRedError::Validation {
            field: field_name.to_string(),
            reason: "field cannot contain whitespace".to_string(),
        });
    }
    if IpAddr::from_str(value).is_ok() {
        return Ok(());
    }
    if is_scheme_url(value) {
        return Ok(());
    }
    if is_hostname(value) {
        return Ok(());
    }
    Err(CyberRedError::Validation {
        field: field_name.to_string(),
        reason: format!(
            "invalid target format: '{value}', must be a valid IP address, URL, or hostname"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ipv4_and_ipv6() {
        assert!(validate_target("192.0.2.10", "target").is_ok());
        assert!(validate_target("::1", "target").is_ok());
    }

    #[test]
    fn accepts_scheme_urls() {
        assert!(validate_target("https://example.com/path", "target").is_ok());
        assert!(validate_target("ssh://10.0.0.1:22", "target").is_ok());
    }

    #[test]
    fn accepts_hostnames() {
        assert!(validate_target("scanner-1.lab.internal", "target").is_ok());
    }

    #[test]
    fn rejects_whitespace() {
        assert!(validate_target("192.0.2.10 extra", "target").is_err());
        assert!(validate_target("   ", "target").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(validate_target("!!not a target!!", "target").is_err());
    }

    #[test]
    fn severity_is_case_sensitive() {
        assert!(validate_severity("critical").is_ok());
        assert!(validate_severity("Critical").is_err());
        assert!(validate_severity("extreme").is_err());
    }

    #[test]
    fn timestamp_accepts_z_suffix() {
        assert!(validate_timestamp("2025-12-27T23:30:00Z", "timestamp").is_ok());
        assert!(validate_timestamp("not-a-timestamp", "timestamp").is_err());
    }
}
