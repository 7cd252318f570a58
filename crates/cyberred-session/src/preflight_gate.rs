//! The session manager's view of the pre-flight runner.
//!
//! Deliberately narrow (cf. `cyberred-output::LlmClient`,
//! `cyberred-killswitch::AuditSink`): `cyberred-preflight`'s shipped
//! checks need live handles to the data store and LLM gateway that the
//! session manager itself has no business holding, so `cyberred-daemon`
//! wires a concrete gate backed by a real `PreFlightRunner` plus those
//! handles.

use async_trait::async_trait;

#[async_trait]
pub trait PreflightGate: Send + Sync {
    /// Runs every registered check and validates the results, honoring
    /// `ignore_warnings` exactly as `PreFlightRunner::validate_results`
    /// does. Returns a human-readable failure summary rather than a typed
    /// error so the gate stays decoupled from `cyberred-preflight`'s error
    /// type.
    async fn run(&self, ignore_warnings: bool) -> Result<(), String>;
}
