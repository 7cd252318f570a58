//! Concrete implementations of the narrow traits each library crate
//! defines at its boundary (`cyberred-preflight::checks::{DataStoreHealth,
//! LlmHealth}`, `cyberred-session::PreflightGate`) so this binary can wire
//! real components together without those crates depending on each other.

use std::sync::Arc;

use async_trait::async_trait;
use cyberred_bus::EventBus;
use cyberred_llm::Provider;
use cyberred_preflight::checks::{DataStoreHealth, LlmHealth};
use cyberred_preflight::PreFlightRunner;
use cyberred_session::PreflightGate;

/// Probes the shared event bus's reachability. `EventBus` has no
/// dedicated `PING` call; `connect()` doubles as the liveness probe since
/// it resolves the master address and opens (or confirms) a live
/// connection manager, failing the same way a `PING` would.
pub struct BusHealth {
    bus: Arc<EventBus>,
}

impl BusHealth {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl DataStoreHealth for BusHealth {
    async fn ping(&self) -> Result<(), String> {
        self.bus.connect().await.map_err(|err| err.to_string())
    }
}

/// Probes one provider tier directly rather than routing through the
/// gateway's queue, so pre-flight doesn't have to wait on in-flight
/// requests ahead of it.
pub struct ProviderHealth {
    probe: Arc<dyn Provider>,
}

impl ProviderHealth {
    pub fn new(probe: Arc<dyn Provider>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl LlmHealth for ProviderHealth {
    async fn health_check(&self) -> bool {
        self.probe.health_check().await
    }
}

/// Runs every registered pre-flight check and validates the results,
/// giving the session manager a gate it can call without depending on
/// `cyberred-preflight` directly.
pub struct DaemonPreflightGate {
    runner: PreFlightRunner,
}

impl DaemonPreflightGate {
    pub fn new(runner: PreFlightRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl PreflightGate for DaemonPreflightGate {
    async fn run(&self, ignore_warnings: bool) -> Result<(), String> {
        let results = self.runner.run_all().await;
        PreFlightRunner::validate_results(&results, ignore_warnings).map_err(|err| err.to_string())
    }
}
