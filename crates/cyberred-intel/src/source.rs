//! Mirrors `original_source/src/cyberred/intelligence/base.py`'s
//! `IntelligenceSource` ABC: `query`/`health_check`, plus `name`/`timeout`/
//! `priority` accessors uniform across CISA KEV, NVD, ExploitDB, Nuclei,
//! Metasploit style sources.

use std::time::Duration;

use async_trait::async_trait;
use cyberred_core::{IntelPriority, IntelResult};

pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait IntelSource: Send + Sync {
    fn name(&self) -> &str;

    fn timeout(&self) -> Duration {
        DEFAULT_SOURCE_TIMEOUT
    }

    fn priority(&self) -> IntelPriority {
        IntelPriority::Exploitdb
    }

    async fn query(&self, service: &str, version: &str) -> Result<Vec<IntelResult>, String>;

    async fn health_check(&self) -> bool;
}
