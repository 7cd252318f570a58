//! Validated engagement state transitions with listener dispatch.
//!
//! Grounded on `original_source/src/cyberred/daemon/state_machine.py`.

pub mod error;
pub mod machine;
pub mod publisher;
pub mod state;

pub use error::InvalidStateTransition;
pub use machine::{EngagementStateMachine, Listener};
pub use publisher::StateChangePublisher;
pub use state::{is_valid_transition, valid_targets, EngagementState};
