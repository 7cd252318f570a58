use thiserror::Error;

use crate::state::EngagementState;

#[derive(Error, Debug)]
#[error("invalid state transition for engagement '{engagement_id}': {from} -> {to}")]
pub struct InvalidStateTransition {
    pub engagement_id: String,
    pub from: EngagementState,
    pub to: EngagementState,
}
