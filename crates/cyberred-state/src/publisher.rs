//! Breaks the state-machine ↔ event-bus ↔ session-manager dependency cycle
//! (spec.md §9 Design Notes, "Cycle risk"): the state machine only knows
//! about this trait, and the session manager supplies the concrete
//! implementation that actually publishes to the event bus.

use async_trait::async_trait;

use crate::state::EngagementState;

#[async_trait]
pub trait StateChangePublisher: Send + Sync {
    async fn publish_state_change(
        &self,
        engagement_id: &str,
        from: EngagementState,
        to: EngagementState,
    );
}
