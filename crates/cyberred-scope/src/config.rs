use ipnet::IpNet;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Whether RFC 1918 / private-range targets are permitted (still
    /// subject to the allow-list below). Reserved ranges (loopback,
    /// link-local, multicast, broadcast) are never permitted regardless.
    pub allow_private: bool,
    /// CIDR networks explicitly authorized for this engagement.
    pub allowed_networks: Vec<IpNet>,
    /// Exact hostnames explicitly authorized for this engagement.
    pub allowed_hosts: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            allow_private: false,
            allowed_networks: Vec::new(),
            allowed_hosts: Vec::new(),
        }
    }
}

impl ScopeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}
