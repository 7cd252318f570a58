//! `DaemonConfig`: a `serde_yaml`-loaded tree with `CYBERRED_<SECTION>__<KEY>`
//! environment overrides merged in before final deserialization, per
//! spec.md §6 and SPEC_FULL.md §1.1/§6.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

const ENV_PREFIX: &str = "CYBERRED_";

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub base_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub sentinel_addrs: Vec<String>,
    pub sentinel_service_name: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            sentinel_addrs: Vec::new(),
            sentinel_service_name: None,
        }
    }
}

impl RedisConfig {
    pub fn direct_url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }

    pub fn sentinel(&self) -> Option<cyberred_bus::SentinelConfig> {
        let service_name = self.sentinel_service_name.clone()?;
        if self.sentinel_addrs.is_empty() {
            return None;
        }
        Some(cyberred_bus::SentinelConfig {
            sentinel_addrs: self.sentinel_addrs.clone(),
            service_name,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub model_name: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub timeout_secs: u64,
    pub rate_limit_rpm: u32,
    pub rate_limit_burst: u32,
    pub fast: ProviderConfig,
    pub standard: ProviderConfig,
    pub complex: ProviderConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            rate_limit_rpm: cyberred_llm::rate_limiter::DEFAULT_RPM,
            rate_limit_burst: 10,
            fast: ProviderConfig {
                model_name: "fast-model".to_string(),
                endpoint: "http://127.0.0.1:11434/v1/fast".to_string(),
            },
            standard: ProviderConfig {
                model_name: "standard-model".to_string(),
                endpoint: "http://127.0.0.1:11434/v1/standard".to_string(),
            },
            complex: ProviderConfig {
                model_name: "complex-model".to_string(),
                endpoint: "http://127.0.0.1:11434/v1/complex".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Hex-encoded HMAC key signing trusted timestamps and audit entries.
    /// When absent a fresh key is generated at boot and a warning is
    /// logged — signatures won't verify across restarts, acceptable for
    /// the zero-config quickstart path but not production use.
    pub time_key_hex: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self { time_key_hex: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_engagements: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_engagements: 16 }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path} as yaml: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("converting {path} to the config schema: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads `path` as YAML, merges `CYBERRED_<SECTION>__<KEY>` environment
/// overrides on top (double underscore = one level of nesting), and
/// deserializes the merged tree into [`DaemonConfig`].
pub fn load(path: &std::path::Path) -> Result<DaemonConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let mut tree: Value = serde_json::to_value(yaml).map_err(|source| ConfigError::Schema {
        path: path.to_path_buf(),
        source,
    })?;

    apply_env_overrides(&mut tree, std::env::vars());

    serde_json::from_value(tree).map_err(|source| ConfigError::Schema {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env_overrides(tree: &mut Value, vars: impl Iterator<Item = (String, String)>) {
    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = rest.split("__").map(|s| s.to_lowercase()).collect();
        if segments.iter().any(String::is_empty) {
            continue;
        }
        set_path(tree, &segments, parse_scalar(&value));
    }
}

fn set_path(tree: &mut Value, segments: &[String], leaf: Value) {
    if !tree.is_object() {
        *tree = Value::Object(serde_json::Map::new());
    }
    let Value::Object(map) = tree else { unreachable!() };

    match segments {
        [] => {}
        [only] => {
            map.insert(only.clone(), leaf);
        }
        [head, tail @ ..] => {
            let entry = map.entry(head.clone()).or_insert_with(|| Value::Object(serde_json::Map::new()));
            set_path(entry, tail, leaf);
        }
    }
}

fn parse_scalar(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_nests_by_double_underscore() {
        let mut tree = serde_json::json!({ "storage": { "base_path": "/var/cyberred" } });
        apply_env_overrides(
            &mut tree,
            vec![
                ("CYBERRED_STORAGE__BASE_PATH".to_string(), "/tmp/cr".to_string()),
                ("CYBERRED_REDIS__PORT".to_string(), "6380".to_string()),
                ("IRRELEVANT".to_string(), "x".to_string()),
            ]
            .into_iter(),
        );
        assert_eq!(tree["storage"]["base_path"], "/tmp/cr");
        assert_eq!(tree["redis"]["port"], 6380);
        assert!(tree.get("irrelevant").is_none());
    }

    #[test]
    fn loads_and_overrides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cyberred.yaml");
        std::fs::write(&path, "storage:\n  base_path: /var/cyberred\n").unwrap();
        std::env::set_var("CYBERRED_STORAGE__BASE_PATH", dir.path().to_str().unwrap());
        let config = load(&path).unwrap();
        assert_eq!(config.storage.base_path, dir.path());
        std::env::remove_var("CYBERRED_STORAGE__BASE_PATH");
    }
}
