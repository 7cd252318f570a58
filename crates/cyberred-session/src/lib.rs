//! Engagement registry, subscription fan-out, and lifecycle orchestration
//! tying the state machine, event bus, checkpoint store, and pre-flight
//! runner together. Grounded on spec.md §4.L.

pub mod context;
pub mod error;
pub mod ipc_handler;
pub mod manager;
pub mod preflight_gate;

pub use context::EngagementContext;
pub use error::SessionError;
pub use manager::{BusFactory, SessionManager};
pub use preflight_gate::PreflightGate;
