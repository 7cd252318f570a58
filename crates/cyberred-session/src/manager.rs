//! Engagement registry and lifecycle orchestration. Grounded on spec.md
//! §4.L and `original_source/src/cyberred/daemon/session_manager.py`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cyberred_bus::EventBus;
use cyberred_checkpoint::{AgentSnapshot, CheckpointSnapshot, CheckpointStore};
use cyberred_core::Engagement;
use cyberred_state::{EngagementState, Listener};
use cyberred_time::TrustedTime;
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::EngagementContext;
use crate::error::SessionError;
use crate::preflight_gate::PreflightGate;

/// Builds a fresh, engagement-scoped event bus connection. Kept as a
/// factory closure rather than a fixed `EventBusConfig` so the daemon can
/// supply sentinel/buffer settings without this crate depending on the
/// concrete YAML config shape.
pub type BusFactory = Arc<dyn Fn(&str, Vec<u8>) -> Arc<EventBus> + Send + Sync>;

pub struct SessionManager {
    engagements: RwLock<HashMap<String, Arc<EngagementContext>>>,
    max_engagements: usize,
    checkpoint_store: Arc<CheckpointStore>,
    time: Arc<TrustedTime>,
    preflight: Arc<dyn PreflightGate>,
    bus_factory: BusFactory,
    stop_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(
        max_engagements: usize,
        checkpoint_store: Arc<CheckpointStore>,
        time: Arc<TrustedTime>,
        preflight: Arc<dyn PreflightGate>,
        bus_factory: BusFactory,
    ) -> Self {
        Self {
            engagements: RwLock::new(HashMap::new()),
            max_engagements,
            checkpoint_store,
            time,
            preflight,
            bus_factory,
            stop_lock: Mutex::new(()),
        }
    }

    pub async fn list(&self) -> Vec<(String, EngagementState)> {
        let engagements = self.engagements.read().await;
        let mut out = Vec::with_capacity(engagements.len());
        for (id, ctx) in engagements.iter() {
            out.push((id.clone(), ctx.state().await));
        }
        out
    }

    pub async fn get(&self, engagement_id: &str) -> Result<Arc<EngagementContext>, SessionError> {
        self.engagements
            .read()
            .await
            .get(engagement_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(engagement_id.to_string()))
    }

    /// Parses `config_path` (just to validate it opens and parses; the
    /// typed shape is the daemon's concern), hashes `scope_path`, and
    /// registers a fresh `INITIALIZING` engagement with a state-change
    /// listener that republishes on `engagement:<id>:state`.
    pub async fn create_engagement(
        &self,
        config_path: PathBuf,
        scope_path: PathBuf,
        engagement_key: Vec<u8>,
        name: String,
    ) -> Result<String, SessionError> {
        {
            let engagements = self.engagements.read().await;
            if engagements.len() >= self.max_engagements {
                return Err(SessionError::CapacityExceeded {
                    max: self.max_engagements,
                });
            }
        }

        parse_config(&config_path)?;
        let scope_hash = hash_file(&scope_path)?;

        let id = Uuid::new_v4().to_string();
        let now = self.time.now();
        let bus = (self.bus_factory)(&id, engagement_key);

        let mut context = EngagementContext::new(
            id.clone(),
            name.clone(),
            config_path,
            scope_path,
            scope_hash,
            now.clone(),
            bus,
        );

        let listener_bus = Arc::clone(&context.bus);
        let listener_id = id.clone();
        let listener_time = Arc::clone(&self.time);
        context
            .state_machine
            .get_mut()
            .add_listener(Listener::Async(Arc::new(move |from, to| {
                let bus = Arc::clone(&listener_bus);
                let engagement_id = listener_id.clone();
                let timestamp = listener_time.now();
                Box::pin(async move {
                    bus.publish(
                        &format!("engagement:{engagement_id}:state"),
                        json!({ "from": from.to_string(), "to": to.to_string() }),
                        &timestamp,
                    )
                    .await
                    .map(|_| ())
                    .map_err(|err| err.to_string())
                })
            })));

        let context = Arc::new(context);
        self.engagements
            .write()
            .await
            .insert(id.clone(), Arc::clone(&context));

        info!(engagement_id = %id, name, "engagement registered");
        Ok(id)
    }

    /// Re-validates the config can still be opened, runs pre-flight, and
    /// on success transitions `INITIALIZING -> RUNNING`.
    pub async fn start_engagement(
        &self,
        engagement_id: &str,
        ignore_warnings: bool,
    ) -> Result<(), SessionError> {
        let context = self.get(engagement_id).await?;
        parse_config(&context.config_path)?;
        self.preflight
            .run(ignore_warnings)
            .await
            .map_err(SessionError::PreflightFailed)?;

        context.state_machine.lock().await.start()?;
        Ok(())
    }

    /// Hot operation: transitions in memory only, no disk I/O, completes
    /// well under the 1s contract since it's a single mutex-guarded state
    /// transition.
    pub async fn pause_engagement(&self, engagement_id: &str) -> Result<(), SessionError> {
        let context = self.get(engagement_id).await?;
        context.state_machine.lock().await.pause()?;
        Ok(())
    }

    pub async fn resume_engagement(&self, engagement_id: &str) -> Result<(), SessionError> {
        let context = self.get(engagement_id).await?;
        context.state_machine.lock().await.resume()?;
        Ok(())
    }

    /// Transitions to `STOPPED` and writes a checkpoint. A second call
    /// against an already-stopped engagement fails the state transition
    /// before any checkpoint I/O runs, making `stop` idempotent-failing
    /// rather than double-writing.
    pub async fn stop_engagement(
        &self,
        engagement_id: &str,
        agents: Vec<AgentSnapshot>,
        findings: Vec<cyberred_core::Finding>,
    ) -> Result<(), SessionError> {
        let _guard = self.stop_lock.lock().await;
        let context = self.get(engagement_id).await?;
        context.state_machine.lock().await.stop()?;

        let engagement = Engagement::new(
            context.id.clone(),
            context.name.clone(),
            context.scope_hash.clone(),
            context.state().await.to_string(),
            context.created_at.clone(),
            self.time.now(),
            context.config_path.to_string_lossy().to_string(),
            context.scope_path.to_string_lossy().to_string(),
        )
        .map_err(|err| SessionError::Configuration {
            path: context.config_path.to_string_lossy().to_string(),
            reason: err.to_string(),
        })?;

        let snapshot = CheckpointSnapshot {
            engagement,
            agents,
            findings,
            audit: Vec::new(),
        };
        self.checkpoint_store.save(snapshot, self.time.now()).await?;
        Ok(())
    }

    pub async fn remove_engagement(&self, engagement_id: &str) -> Result<(), SessionError> {
        let mut engagements = self.engagements.write().await;
        engagements
            .remove(engagement_id)
            .map(|_| ())
            .ok_or_else(|| SessionError::NotFound(engagement_id.to_string()))
    }

    /// Triggered by a debounced config-file change (the daemon's
    /// `notify`-backed watcher). Re-validates every registered
    /// engagement's config file without touching its running state.
    pub async fn handle_config_reload(&self) {
        let engagements = self.engagements.read().await;
        for (id, context) in engagements.iter() {
            if let Err(err) = parse_config(&context.config_path) {
                warn!(engagement_id = %id, error = %err, "config no longer valid after reload");
            }
        }
        info!(count = engagements.len(), "config reload re-validation complete");
    }
}

fn parse_config(path: &Path) -> Result<serde_yaml::Value, SessionError> {
    let contents = std::fs::read_to_string(path).map_err(|err| SessionError::Configuration {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    serde_yaml::from_str(&contents).map_err(|err| SessionError::Configuration {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

/// Reads the `name` and `scope_path` fields an engagement config must
/// carry so `engagement.start` can create the engagement from just a
/// `config_path`, matching spec.md §6's example request.
pub(crate) fn read_engagement_descriptor(path: &Path) -> Result<(String, PathBuf), SessionError> {
    let config = parse_config(path)?;
    let missing = |field: &str| SessionError::Configuration {
        path: path.display().to_string(),
        reason: format!("missing required field '{field}'"),
    };
    let name = config
        .get("name")
        .and_then(serde_yaml::Value::as_str)
        .ok_or_else(|| missing("name"))?
        .to_string();
    let scope_path = config
        .get("scope_path")
        .and_then(serde_yaml::Value::as_str)
        .ok_or_else(|| missing("scope_path"))?;
    Ok((name, PathBuf::from(scope_path)))
}

/// Fresh per-engagement HMAC key for signing that engagement's event bus
/// payloads (spec.md §6's "Authenticated messages"). Never persisted
/// outside the checkpoint store's signed snapshot.
pub(crate) fn random_engagement_key() -> Vec<u8> {
    use rand::RngCore;
    let mut key = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

fn hash_file(path: &Path) -> Result<String, SessionError> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hasher.finalize().iter().map(|b| format!("{b:02x}")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cyberred_bus::EventBusConfig;
    use std::time::Duration;
    use tempfile::tempdir;

    struct AlwaysPass;

    #[async_trait]
    impl PreflightGate for AlwaysPass {
        async fn run(&self, _ignore_warnings: bool) -> Result<(), String> {
            Ok(())
        }
    }

    struct AlwaysFail;

    #[async_trait]
    impl PreflightGate for AlwaysFail {
        async fn run(&self, _ignore_warnings: bool) -> Result<(), String> {
            Err("data store unreachable".to_string())
        }
    }

    fn bus_factory() -> BusFactory {
        Arc::new(|engagement_id, engagement_key| {
            EventBus::new(EventBusConfig {
                sentinel: None,
                direct_url: None,
                engagement_id: engagement_id.to_string(),
                engagement_key,
                buffer_max_count: 16,
                buffer_max_age: Duration::from_secs(60),
                base_backoff: Duration::from_millis(10),
                max_backoff: Duration::from_millis(100),
            })
        })
    }

    fn write_fixture(dir: &std::path::Path) -> (PathBuf, PathBuf) {
        let config_path = dir.join("engagement.yaml");
        let scope_path = dir.join("scope.yaml");
        std::fs::write(&config_path, "name: test-engagement\n").unwrap();
        std::fs::write(&scope_path, "allowed_networks: []\n").unwrap();
        (config_path, scope_path)
    }

    fn manager(preflight: Arc<dyn PreflightGate>, checkpoint_dir: &std::path::Path) -> SessionManager {
        SessionManager::new(
            4,
            Arc::new(CheckpointStore::new(checkpoint_dir.to_path_buf())),
            Arc::new(TrustedTime::spawn(cyberred_time::TrustedTimeConfig::default())),
            preflight,
            bus_factory(),
        )
    }

    #[tokio::test]
    async fn create_and_start_transitions_to_running() {
        let dir = tempdir().unwrap();
        let (config_path, scope_path) = write_fixture(dir.path());
        let mgr = manager(Arc::new(AlwaysPass), dir.path());

        let id = mgr
            .create_engagement(config_path, scope_path, vec![1, 2, 3, 4], "op".to_string())
            .await
            .unwrap();
        mgr.start_engagement(&id, false).await.unwrap();

        let context = mgr.get(&id).await.unwrap();
        assert_eq!(context.state().await, EngagementState::Running);
    }

    #[tokio::test]
    async fn start_blocked_by_failing_preflight() {
        let dir = tempdir().unwrap();
        let (config_path, scope_path) = write_fixture(dir.path());
        let mgr = manager(Arc::new(AlwaysFail), dir.path());

        let id = mgr
            .create_engagement(config_path, scope_path, vec![1, 2, 3, 4], "op".to_string())
            .await
            .unwrap();
        let err = mgr.start_engagement(&id, false).await.unwrap_err();
        assert!(matches!(err, SessionError::PreflightFailed(_)));
    }

    #[tokio::test]
    async fn pause_and_resume_are_hot_state_transitions() {
        let dir = tempdir().unwrap();
        let (config_path, scope_path) = write_fixture(dir.path());
        let mgr = manager(Arc::new(AlwaysPass), dir.path());
        let id = mgr
            .create_engagement(config_path, scope_path, vec![1, 2, 3, 4], "op".to_string())
            .await
            .unwrap();
        mgr.start_engagement(&id, false).await.unwrap();

        mgr.pause_engagement(&id).await.unwrap();
        assert_eq!(mgr.get(&id).await.unwrap().state().await, EngagementState::Paused);
        mgr.resume_engagement(&id).await.unwrap();
        assert_eq!(mgr.get(&id).await.unwrap().state().await, EngagementState::Running);
    }

    #[tokio::test]
    async fn stop_is_idempotent_failing() {
        let dir = tempdir().unwrap();
        let (config_path, scope_path) = write_fixture(dir.path());
        let mgr = manager(Arc::new(AlwaysPass), dir.path());
        let id = mgr
            .create_engagement(config_path, scope_path, vec![1, 2, 3, 4], "op".to_string())
            .await
            .unwrap();
        mgr.start_engagement(&id, false).await.unwrap();

        mgr.stop_engagement(&id, Vec::new(), Vec::new()).await.unwrap();
        let err = mgr.stop_engagement(&id, Vec::new(), Vec::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::StateTransition(_)));
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let dir = tempdir().unwrap();
        let mgr = manager(Arc::new(AlwaysPass), dir.path());
        for i in 0..4 {
            let sub = dir.path().join(format!("sub{i}"));
            std::fs::create_dir_all(&sub).unwrap();
            let (config_path, scope_path) = write_fixture(&sub);
            mgr.create_engagement(config_path, scope_path, vec![1, 2, 3, 4], "op".to_string())
                .await
                .unwrap();
        }
        let sub = dir.path().join("sub-overflow");
        std::fs::create_dir_all(&sub).unwrap();
        let (config_path, scope_path) = write_fixture(&sub);
        let err = mgr
            .create_engagement(config_path, scope_path, vec![1, 2, 3, 4], "op".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::CapacityExceeded { .. }));
    }

    #[tokio::test]
    async fn config_reload_does_not_touch_running_state() {
        let dir = tempdir().unwrap();
        let (config_path, scope_path) = write_fixture(dir.path());
        let mgr = manager(Arc::new(AlwaysPass), dir.path());
        let id = mgr
            .create_engagement(config_path, scope_path, vec![1, 2, 3, 4], "op".to_string())
            .await
            .unwrap();
        mgr.start_engagement(&id, false).await.unwrap();

        mgr.handle_config_reload().await;
        assert_eq!(mgr.get(&id).await.unwrap().state().await, EngagementState::Running);
    }
}
