//! Implements `cyberred_ipc::CommandHandler` against the session registry
//! so the IPC server can dispatch the closed command set directly to it.

use std::path::PathBuf;

use async_trait::async_trait;
use cyberred_ipc::{AttachResult, Command, CommandHandler, HandlerOutcome, StreamEvent};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::manager::{random_engagement_key, read_engagement_descriptor, SessionManager};

#[async_trait]
impl CommandHandler for SessionManager {
    async fn handle(&self, command: Command, params: Value) -> HandlerOutcome {
        let result = match command {
            Command::SessionsList => self.handle_sessions_list().await,
            Command::EngagementStart => self.handle_start(params).await,
            Command::EngagementPause => self.handle_pause(params).await,
            Command::EngagementResume => self.handle_resume(params).await,
            Command::EngagementStop => self.handle_stop(params).await,
            Command::DaemonStop => Ok(json!({})),
            Command::DaemonConfigReload => {
                self.handle_config_reload().await;
                Ok(json!({}))
            }
            Command::EngagementAttach | Command::EngagementDetach => {
                unreachable!("handled directly by the ipc server's attach/detach path")
            }
        };
        match result {
            Ok(data) => HandlerOutcome::Ok(data),
            Err(message) => HandlerOutcome::Error(message),
        }
    }

    async fn attach(
        &self,
        engagement_id: &str,
        sink: mpsc::Sender<StreamEvent>,
    ) -> Result<AttachResult, String> {
        let context = self.get(engagement_id).await.map_err(|err| err.to_string())?;
        let subscription_id = Uuid::new_v4().to_string();
        context.add_subscription(subscription_id.clone(), sink).await;
        Ok(AttachResult {
            subscription_id,
            state: context.state().await.to_string(),
            agent_count: context.agent_count(),
            finding_count: context.finding_count(),
        })
    }

    async fn detach(&self, subscription_id: &str) -> Result<(), String> {
        let engagements = self.list().await;
        for (id, _) in engagements {
            if let Ok(context) = self.get(&id).await {
                if context.remove_subscription(subscription_id).await {
                    return Ok(());
                }
            }
        }
        Err(format!("no such subscription '{subscription_id}'"))
    }
}

impl SessionManager {
    async fn handle_sessions_list(&self) -> Result<Value, String> {
        let sessions: Vec<Value> = self
            .list()
            .await
            .into_iter()
            .map(|(id, state)| json!({ "engagement_id": id, "state": state.to_string() }))
            .collect();
        Ok(json!({ "engagements": sessions }))
    }

    /// Creates a fresh engagement from `config_path` and starts it in one
    /// step, matching spec.md §6's `engagement.start` example request
    /// (which carries no pre-existing engagement id).
    async fn handle_start(&self, params: Value) -> Result<Value, String> {
        let config_path = PathBuf::from(require_str(&params, "config_path")?);
        let ignore_warnings = params
            .get("ignore_warnings")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let (name, scope_path) = read_engagement_descriptor(&config_path).map_err(|err| err.to_string())?;
        let engagement_key = random_engagement_key();

        let id = self
            .create_engagement(config_path, scope_path, engagement_key, name)
            .await
            .map_err(|err| err.to_string())?;
        self.start_engagement(&id, ignore_warnings)
            .await
            .map_err(|err| err.to_string())?;

        let state = self.get(&id).await.map_err(|err| err.to_string())?.state().await;
        Ok(json!({ "id": id, "state": state.to_string() }))
    }

    async fn handle_pause(&self, params: Value) -> Result<Value, String> {
        let engagement_id = require_str(&params, "engagement_id")?;
        self.pause_engagement(&engagement_id).await.map_err(|err| err.to_string())?;
        Ok(json!({ "engagement_id": engagement_id }))
    }

    async fn handle_resume(&self, params: Value) -> Result<Value, String> {
        let engagement_id = require_str(&params, "engagement_id")?;
        self.resume_engagement(&engagement_id).await.map_err(|err| err.to_string())?;
        Ok(json!({ "engagement_id": engagement_id }))
    }

    async fn handle_stop(&self, params: Value) -> Result<Value, String> {
        let engagement_id = require_str(&params, "engagement_id")?;
        self.stop_engagement(&engagement_id, Vec::new(), Vec::new())
            .await
            .map_err(|err| err.to_string())?;
        Ok(json!({ "engagement_id": engagement_id }))
    }
}

fn require_str(params: &Value, field: &str) -> Result<String, String> {
    params
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("missing required field '{field}'"))
}
