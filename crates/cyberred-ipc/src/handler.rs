//! The IPC server's view of the session manager.
//!
//! Deliberately narrow (cf. `cyberred-output::LlmClient`,
//! `cyberred-killswitch::AuditSink`): the server only needs to dispatch a
//! closed set of commands and relay stream events to attached clients, not
//! the full `cyberred-session` engagement registry API. `cyberred-daemon`
//! wires a concrete handler backed by the real session manager.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::types::{Command, StreamEvent};

/// Outcome of dispatching one command: either a JSON payload for an `ok`
/// response, or a human-readable message for an `error` response. The
/// server never lets a handler panic propagate into the connection loop;
/// see [`CommandHandler::handle`]'s contract.
pub enum HandlerOutcome {
    Ok(Value),
    Error(String),
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Dispatches one parsed, closed-set command. Implementations must
    /// never let an internal error escape as a panic — every failure mode
    /// (bad config path, unknown engagement id, pre-flight failure) is
    /// reported as [`HandlerOutcome::Error`], matching spec.md §7's "every
    /// error becomes a `status:error` string" rule at the IPC boundary.
    async fn handle(&self, command: Command, params: Value) -> HandlerOutcome;

    /// Registers `sink` to receive `StreamEvent`s for `engagement_id` and
    /// returns a fresh subscription id, or an error message if the
    /// engagement does not exist. Mirrors `attach` from spec.md §4.N;
    /// `sink` is dropped (ending the relay) when the client disconnects.
    async fn attach(
        &self,
        engagement_id: &str,
        sink: mpsc::Sender<StreamEvent>,
    ) -> Result<AttachResult, String>;

    async fn detach(&self, subscription_id: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AttachResult {
    pub subscription_id: String,
    pub state: String,
    pub agent_count: usize,
    pub finding_count: usize,
}
