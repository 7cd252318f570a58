//! Per-engagement state: the state machine, its dedicated event bus
//! connection, and the IPC subscriptions currently attached to it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cyberred_bus::EventBus;
use cyberred_ipc::{StreamEvent, StreamEventType};
use cyberred_state::{EngagementState, EngagementStateMachine};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

pub struct EngagementContext {
    pub id: String,
    pub name: String,
    pub config_path: PathBuf,
    pub scope_path: PathBuf,
    pub scope_hash: String,
    pub created_at: String,
    pub bus: Arc<EventBus>,
    pub state_machine: Mutex<EngagementStateMachine>,
    subscriptions: Mutex<HashMap<String, mpsc::Sender<StreamEvent>>>,
    agent_count: AtomicUsize,
    finding_count: AtomicUsize,
}

impl EngagementContext {
    pub fn new(
        id: String,
        name: String,
        config_path: PathBuf,
        scope_path: PathBuf,
        scope_hash: String,
        created_at: String,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            state_machine: Mutex::new(EngagementStateMachine::new(id.clone())),
            id,
            name,
            config_path,
            scope_path,
            scope_hash,
            created_at,
            bus,
            subscriptions: Mutex::new(HashMap::new()),
            agent_count: AtomicUsize::new(0),
            finding_count: AtomicUsize::new(0),
        }
    }

    pub async fn state(&self) -> EngagementState {
        self.state_machine.lock().await.current_state()
    }

    pub fn agent_count(&self) -> usize {
        self.agent_count.load(Ordering::Relaxed)
    }

    pub fn finding_count(&self) -> usize {
        self.finding_count.load(Ordering::Relaxed)
    }

    pub async fn add_subscription(&self, subscription_id: String, sink: mpsc::Sender<StreamEvent>) {
        self.subscriptions.lock().await.insert(subscription_id, sink);
    }

    pub async fn remove_subscription(&self, subscription_id: &str) -> bool {
        self.subscriptions.lock().await.remove(subscription_id).is_some()
    }

    pub async fn record_agent_status(&self, data: Value, timestamp: String) {
        self.agent_count.fetch_add(1, Ordering::Relaxed);
        self.broadcast(StreamEventType::AgentStatus, data, timestamp).await;
    }

    pub async fn record_finding(&self, data: Value, timestamp: String) {
        self.finding_count.fetch_add(1, Ordering::Relaxed);
        self.broadcast(StreamEventType::Finding, data, timestamp).await;
    }

    pub async fn broadcast(&self, event_type: StreamEventType, data: Value, timestamp: String) {
        let event = StreamEvent {
            event_type,
            data,
            timestamp,
        };
        let mut subscriptions = self.subscriptions.lock().await;
        let mut dead = Vec::new();
        for (subscription_id, sink) in subscriptions.iter() {
            if sink.send(event.clone()).await.is_err() {
                dead.push(subscription_id.clone());
            }
        }
        for subscription_id in dead {
            debug!(engagement_id = %self.id, subscription_id, "dropping subscription with closed sink");
            subscriptions.remove(&subscription_id);
        }
    }
}
