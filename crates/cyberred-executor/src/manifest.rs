//! Tool manifest — a YAML catalog of known Kali tools consulted before
//! scope validation so that an unrecognized tool is rejected the same way
//! an out-of-scope target is: fail closed, before any container is
//! touched.
//!
//! Grounded on `original_source/src/cyberred/tools/manifest.py`.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ExecutorError;

#[derive(Debug, Clone, Deserialize)]
pub struct ToolEntry {
    pub category: String,
    #[serde(default)]
    pub common_flags: Vec<String>,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default)]
    pub requires_root: bool,
}

fn default_output_format() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolManifest {
    tools: HashMap<String, ToolEntry>,
}

impl ToolManifest {
    pub fn from_yaml(yaml: &str) -> Result<Self, ExecutorError> {
        let tools: HashMap<String, ToolEntry> =
            serde_yaml::from_str(yaml).map_err(|e| ExecutorError::ManifestParse {
                reason: e.to_string(),
            })?;
        Ok(Self { tools })
    }

    /// The four MCP-adapter tools plus the teacher-adjacent shipped-parser
    /// tools from SPEC_FULL §4.G, wired in with conservative defaults so
    /// the daemon boots with a working manifest before an operator
    /// supplies their own YAML catalog.
    pub fn builtin() -> Self {
        let builtin_yaml = r#"
nmap:
  category: recon
  common_flags: ["-sV", "-sC", "-p-", "-oX"]
  output_format: xml
  requires_root: false
sqlmap:
  category: exploitation
  common_flags: ["--batch", "--risk=1", "--level=1"]
  output_format: text
  requires_root: false
nikto:
  category: web
  common_flags: ["-h", "-Format", "json"]
  output_format: json
  requires_root: false
ffuf:
  category: web
  common_flags: ["-u", "-w", "-of", "json"]
  output_format: json
  requires_root: false
nuclei:
  category: scanning
  common_flags: ["-jsonl", "-silent"]
  output_format: jsonl
  requires_root: false
masscan:
  category: recon
  common_flags: ["-p", "--rate"]
  output_format: text
  requires_root: true
subfinder:
  category: recon
  common_flags: ["-silent", "-json"]
  output_format: json
  requires_root: false
dnsrecon:
  category: recon
  common_flags: ["-j"]
  output_format: json
  requires_root: false
"#;
        Self::from_yaml(builtin_yaml).expect("builtin manifest YAML is well-formed")
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.get(name)
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_manifest_knows_core_tools() {
        let manifest = ToolManifest::builtin();
        assert!(manifest.is_known("nmap"));
        assert!(manifest.is_known("sqlmap"));
        assert!(!manifest.is_known("rm"));
    }

    #[test]
    fn masscan_requires_root() {
        let manifest = ToolManifest::builtin();
        assert!(manifest.get("masscan").unwrap().requires_root);
    }
}
