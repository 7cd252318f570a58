//! Emergency-stop primitive: every component that launches a tool process
//! must call `check_frozen()` before doing so, and `trigger()` is how an
//! internal safety check (a scope violation, an anomaly detector) halts an
//! engagement. Not exposed as its own IPC verb — spec.md §4.N's command
//! set is closed and has no dedicated kill-trigger command.

pub mod error;
pub mod sink;
pub mod switch;

pub use error::KillSwitchTriggered;
pub use sink::AuditSink;
pub use switch::{KillResult, KillSwitch};
