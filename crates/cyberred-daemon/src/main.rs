//! Cyber-Red coordination kernel daemon entry point: CLI parsing, config
//! load, component wiring, and the IPC server's accept loop.
//!
//! Grounded on `examples/cp5337-sx9/crates/sx9-atlas-daemon/src/main.rs`'s
//! `clap` + `tracing_subscriber` bootstrap, adapted from that daemon's
//! axum HTTP surface to this daemon's Unix-socket IPC surface.

mod adapters;
mod config;
mod watcher;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use cyberred_checkpoint::CheckpointStore;
use cyberred_ipc::IpcServer;
use cyberred_llm::{HttpProvider, LlmGateway, Provider, RateLimiter, Router as LlmRouter};
use cyberred_preflight::checks::{DataStoreCheck, DiskFreeCheck, LlmReachabilityCheck, MemoryAvailableCheck, ScopeFileCheck, TlsCertificateCheck};
use cyberred_preflight::PreFlightRunner;
use cyberred_session::{BusFactory, SessionManager};
use cyberred_time::{TrustedTime, TrustedTimeConfig};
use tracing::{info, warn};

use crate::adapters::{BusHealth, DaemonPreflightGate, ProviderHealth};
use crate::config::DaemonConfig;
use crate::watcher::ConfigWatcher;

#[derive(Parser, Debug)]
#[command(name = "cyberred-daemon")]
#[command(about = "Cyber-Red autonomous offensive-security orchestrator daemon")]
#[command(version)]
struct Args {
    /// Path to the daemon's YAML config file.
    #[arg(long, default_value = "/etc/cyberred/cyberred.yaml")]
    config: PathBuf,

    /// Overrides `storage.base_path` from the config file.
    #[arg(long)]
    storage_base: Option<PathBuf>,

    /// Stay attached to the controlling terminal instead of detaching.
    /// The daemon never forks itself either way; this flag only affects
    /// whether a future process supervisor should expect it to exit
    /// immediately after a successful bind.
    #[arg(long, default_value_t = false)]
    foreground: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cyberred_daemon=info,cyberred_session=info")),
        )
        .init();

    let args = Args::parse();
    if args.foreground {
        info!("running in foreground");
    }

    let mut cfg = config::load(&args.config)?;
    if let Some(base) = args.storage_base {
        cfg.storage.base_path = base;
    }
    std::fs::create_dir_all(&cfg.storage.base_path)?;
    std::fs::create_dir_all(cfg.storage.base_path.join("engagements"))?;

    run(cfg, args.config).await
}

async fn run(cfg: DaemonConfig, config_path: PathBuf) -> anyhow::Result<()> {
    let time_key = match &cfg.security.time_key_hex {
        Some(hex) => decode_hex(hex)?,
        None => {
            warn!("security.time_key_hex not set, generating an ephemeral key for this run only");
            use rand::RngCore;
            let mut key = vec![0u8; 32];
            rand::thread_rng().fill_bytes(&mut key);
            key
        }
    };

    let time = Arc::new(TrustedTime::spawn(TrustedTimeConfig::default()));

    let checkpoint_store = Arc::new(CheckpointStore::new(cfg.storage.base_path.clone()));

    let fast: Arc<dyn Provider> = Arc::new(HttpProvider::new(
        cfg.llm.fast.model_name.clone(),
        cfg.llm.fast.endpoint.clone(),
        cfg.llm.rate_limit_rpm,
    ));
    let standard: Arc<dyn Provider> = Arc::new(HttpProvider::new(
        cfg.llm.standard.model_name.clone(),
        cfg.llm.standard.endpoint.clone(),
        cfg.llm.rate_limit_rpm,
    ));
    let complex: Arc<dyn Provider> = Arc::new(HttpProvider::new(
        cfg.llm.complex.model_name.clone(),
        cfg.llm.complex.endpoint.clone(),
        cfg.llm.rate_limit_rpm,
    ));
    let health_probe = Arc::clone(&fast);
    let llm_router = LlmRouter::new(fast, standard, complex);
    let llm_limiter = RateLimiter::new(cfg.llm.rate_limit_rpm, cfg.llm.rate_limit_burst);
    let _gateway = LlmGateway::spawn(llm_router, llm_limiter);

    let control_bus = cyberred_bus::EventBus::new(cyberred_bus::EventBusConfig {
        sentinel: cfg.redis.sentinel(),
        direct_url: Some(cfg.redis.direct_url()),
        engagement_id: "daemon-control".to_string(),
        engagement_key: time_key.clone(),
        buffer_max_count: 256,
        buffer_max_age: Duration::from_secs(60),
        base_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_secs(5),
    });

    let mut runner = PreFlightRunner::new();
    runner.register(Box::new(DataStoreCheck::new(Arc::new(BusHealth::new(Arc::clone(&control_bus))))));
    runner.register(Box::new(LlmReachabilityCheck::new(Arc::new(ProviderHealth::new(health_probe)))));
    runner.register(Box::new(TlsCertificateCheck::new(None)));
    runner.register(Box::new(ScopeFileCheck::new(cfg.storage.base_path.join("scope.yaml"))));
    runner.register(Box::new(DiskFreeCheck::new(cfg.storage.base_path.clone())));
    runner.register(Box::new(MemoryAvailableCheck));
    let preflight = Arc::new(DaemonPreflightGate::new(runner));

    let redis_cfg = cfg.redis.clone();
    let bus_factory: BusFactory = Arc::new(move |engagement_id, engagement_key| {
        cyberred_bus::EventBus::new(cyberred_bus::EventBusConfig {
            sentinel: redis_cfg.sentinel(),
            direct_url: Some(redis_cfg.direct_url()),
            engagement_id: engagement_id.to_string(),
            engagement_key,
            buffer_max_count: 256,
            buffer_max_age: Duration::from_secs(120),
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        })
    });

    let session_manager = Arc::new(SessionManager::new(
        cfg.session.max_engagements,
        Arc::clone(&checkpoint_store),
        Arc::clone(&time),
        preflight,
        bus_factory,
    ));

    let socket_path = cfg.storage.base_path.join("daemon.sock");
    let pid_path = cfg.storage.base_path.join("daemon.pid");
    let ipc_server = Arc::new(IpcServer::new(socket_path, pid_path, Arc::clone(&session_manager)));
    let listener = ipc_server.bind().await?;

    let mut config_watcher = match ConfigWatcher::new(config_path) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            warn!(error = %err, "config hot reload disabled");
            None
        }
    };

    let shutdown = shutdown_signal(Arc::clone(&session_manager), &mut config_watcher);
    info!("cyberred-daemon ready");
    ipc_server.serve(listener, shutdown).await;
    ipc_server.cleanup();
    time.stop();
    info!("cyberred-daemon stopped");
    Ok(())
}

/// Resolves on SIGTERM/SIGINT (graceful shutdown, per spec.md §4.N's
/// Lifetime contract); loops forever re-running config reload on every
/// debounced SIGHUP-equivalent filesystem change or on an actual SIGHUP.
async fn shutdown_signal(session_manager: Arc<SessionManager>, config_watcher: &mut Option<ConfigWatcher>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                return;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                return;
            }
            _ = sighup.recv() => {
                info!("received SIGHUP, reloading config");
                session_manager.handle_config_reload().await;
            }
            _ = watch_changed(config_watcher) => {
                info!("config file changed on disk, reloading");
                session_manager.handle_config_reload().await;
            }
        }
    }
}

async fn watch_changed(config_watcher: &mut Option<ConfigWatcher>) {
    match config_watcher {
        Some(watcher) => watcher.changed().await,
        None => loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        },
    }
}

/// `security.time_key_hex` is decoded by hand rather than pulling in the
/// `hex` crate, matching `cyberred-checkpoint::model::hex_bytes`'s
/// manual encode/decode.
fn decode_hex(raw: &str) -> anyhow::Result<Vec<u8>> {
    if raw.len() % 2 != 0 {
        anyhow::bail!("time_key_hex must have an even number of hex digits");
    }
    (0..raw.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&raw[i..i + 2], 16).map_err(anyhow::Error::from))
        .collect()
}
