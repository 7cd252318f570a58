//! The kill switch's view of wherever audit entries end up persisted.
//!
//! Deliberately narrow (cf. `cyberred-output::LlmClient`,
//! `cyberred-preflight::checks::DataStoreHealth`): the kill switch doesn't
//! need to know that the session manager owns a `CheckpointStore` whose
//! `save()` writes a full snapshot rather than appending one row, only
//! that *something* will durably record this entry before the next
//! checkpoint.

use async_trait::async_trait;
use cyberred_checkpoint::AuditEntry;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry);
}
