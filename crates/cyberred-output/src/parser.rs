//! The deterministic Tier-1 parser contract and its lock-guarded registry.
//!
//! A real plugin-loading mechanism can't reuse Python's `getattr`
//! attribute lookup, so SPEC_FULL §4.G realizes the trait/interface as a
//! typed `Parser` trait with one method whose signature matches the
//! five-argument contract (stdout, stderr, exit_code, agent_id, target —
//! plus optional error_type), exactly per spec.md §9 Design Notes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{ParseContext, RawFinding};

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub findings: Vec<RawFinding>,
    pub summary: String,
}

pub trait Parser: Send + Sync {
    fn parse(&self, ctx: &ParseContext<'_>) -> Result<ParseOutcome, String>;
}

/// Lock-guarded map from tool name to its registered parser. All mutation
/// (register/unregister, including hot-reload swaps) goes through this one
/// lock, per spec.md §4.G "all registry operations are serialized by a
/// lock".
#[derive(Default, Clone)]
pub struct ParserRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<dyn Parser>>>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, parser: Arc<dyn Parser>) {
        self.inner.write().insert(name.into(), parser);
    }

    pub fn unregister(&self, name: &str) {
        self.inner.write().remove(name);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Parser>> {
        self.inner.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
