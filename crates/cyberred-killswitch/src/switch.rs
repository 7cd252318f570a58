//! Emergency stop: freeze an engagement, SIGTERM its registered tool
//! processes, and broadcast the halt over the event bus before any
//! orchestration component can enqueue another action.
//!
//! Grounded on spec.md §4.J and `original_source/src/cyberred/safety/
//! kill_switch.py`'s three-step shutdown (publish, SIGTERM, publish). PID
//! delivery shells out to the `kill` binary via `tokio::process::Command`,
//! matching `cyberred-container::RealRuntime`'s pattern for OS-level
//! process control rather than adding a `nix` dependency.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cyberred_bus::EventBus;
use cyberred_checkpoint::AuditEntry;
use serde_json::json;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::KillSwitchTriggered;
use crate::sink::AuditSink;

const KILL_CHANNEL: &str = "control:kill";
const ABORT_CHANNEL: &str = "control:abort";

/// Outcome of a [`KillSwitch::trigger`] call, reported back to whoever
/// invoked it (daemon CLI, IPC command handler, or an internal check).
#[derive(Debug, Clone)]
pub struct KillResult {
    pub engagement_id: String,
    pub reason: String,
    pub signaled_pids: Vec<u32>,
    pub failed_pids: Vec<u32>,
    pub audit_recorded: bool,
}

pub struct KillSwitch {
    engagement_id: String,
    bus: Arc<EventBus>,
    engagement_key: Vec<u8>,
    time_key: Vec<u8>,
    registered_pids: Mutex<Vec<u32>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    frozen: AtomicBool,
}

impl KillSwitch {
    pub fn new(
        engagement_id: String,
        bus: Arc<EventBus>,
        engagement_key: Vec<u8>,
        time_key: Vec<u8>,
        audit_sink: Option<Arc<dyn AuditSink>>,
    ) -> Self {
        Self {
            engagement_id,
            bus,
            engagement_key,
            time_key,
            registered_pids: Mutex::new(Vec::new()),
            audit_sink,
            frozen: AtomicBool::new(false),
        }
    }

    /// Records a spawned tool process so a later `trigger` can SIGTERM it.
    /// Callers are expected to deregister on normal exit; a PID that has
    /// already exited by the time `trigger` runs simply fails its `kill`
    /// call, which is reported in `KillResult::failed_pids` rather than
    /// raised.
    pub async fn register_pid(&self, pid: u32) {
        self.registered_pids.lock().await.push(pid);
    }

    pub async fn deregister_pid(&self, pid: u32) {
        self.registered_pids.lock().await.retain(|p| *p != pid);
    }

    /// Returns `Err` once this engagement has been frozen by a prior
    /// `trigger` call. Callers on the hot path (the tool executor, the
    /// session manager's action loop) should check this before doing any
    /// work rather than polling a status flag.
    pub fn check_frozen(&self) -> Result<(), KillSwitchTriggered> {
        if self.frozen.load(Ordering::SeqCst) {
            Err(KillSwitchTriggered {
                engagement_id: self.engagement_id.clone(),
                reason: "engagement is frozen".to_string(),
            })
        } else {
            Ok(())
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// Freezes the engagement immediately, then fans the halt out over
    /// three independent channels concurrently: a `control:kill` broadcast
    /// (agents still polling the bus stop dispatching new actions), a
    /// SIGTERM to every registered PID, and a final `control:abort`
    /// broadcast for any subscriber that only watches the abort channel.
    /// None of the three block on each other, and a failure in one never
    /// suppresses the others.
    pub async fn trigger(&self, reason: &str, triggered_by: &str, now: &str) -> KillResult {
        self.frozen.store(true, Ordering::SeqCst);
        warn!(engagement_id = %self.engagement_id, reason, triggered_by, "kill switch triggered");

        let pids = self.registered_pids.lock().await.clone();

        let publish_kill = self.bus.publish(
            KILL_CHANNEL,
            json!({
                "engagement_id": self.engagement_id,
                "reason": reason,
                "triggered_by": triggered_by,
            }),
            now,
        );
        let signal_pids = signal_all(&pids);
        let publish_abort = self.bus.publish(
            ABORT_CHANNEL,
            json!({ "engagement_id": self.engagement_id }),
            now,
        );

        let (kill_res, (signaled_pids, failed_pids), abort_res) =
            tokio::join!(publish_kill, signal_pids, publish_abort);

        if let Err(err) = kill_res {
            error!(error = %err, "control:kill broadcast failed");
        }
        if let Err(err) = abort_res {
            error!(error = %err, "control:abort broadcast failed");
        }

        let audit_recorded = self.record_audit(reason, triggered_by, now, &pids).await;

        KillResult {
            engagement_id: self.engagement_id.clone(),
            reason: reason.to_string(),
            signaled_pids,
            failed_pids,
            audit_recorded,
        }
    }

    async fn record_audit(
        &self,
        reason: &str,
        triggered_by: &str,
        now: &str,
        pids: &[u32],
    ) -> bool {
        let Some(sink) = &self.audit_sink else {
            return false;
        };
        let signature = cyberred_time::sign_timestamp(now, &self.time_key);
        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            engagement_id: self.engagement_id.clone(),
            timestamp: now.to_string(),
            action: "kill_switch_triggered".to_string(),
            triggered_by: triggered_by.to_string(),
            details: json!({ "reason": reason, "signaled_pids": pids }),
            evidence: Vec::new(),
            signature,
        };
        sink.record(entry).await;
        info!(engagement_id = %self.engagement_id, "kill switch audit entry recorded");
        true
    }
}

async fn signal_all(pids: &[u32]) -> (Vec<u32>, Vec<u32>) {
    let mut signaled = Vec::new();
    let mut failed = Vec::new();
    for &pid in pids {
        match Command::new("kill")
            .arg("-TERM")
            .arg(pid.to_string())
            .status()
            .await
        {
            Ok(status) if status.success() => signaled.push(pid),
            _ => failed.push(pid),
        }
    }
    (signaled, failed)
}
