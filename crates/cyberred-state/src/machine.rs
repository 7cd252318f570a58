//! Engagement lifecycle state machine with listener dispatch.
//!
//! The Python original dispatches listeners by runtime-introspecting
//! whether the callback is a coroutine function
//! (`asyncio.iscoroutinefunction`) and, for async listeners, spawning a
//! task only if an event loop happens to be running (logging a warning
//! otherwise). Rust has no equivalent runtime introspection for closures,
//! so listeners are registered through a typed [`Listener`] enum instead —
//! the caller states up front whether a listener is sync or async, and the
//! async variant always has `tokio::spawn` available since the state
//! machine itself is only ever driven from inside the daemon's runtime.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::InvalidStateTransition;
use crate::state::{is_valid_transition, EngagementState};

type BoxFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

/// A registered state-change callback. `Sync` listeners run inline on the
/// transitioning caller's stack; `Async` listeners are spawned as detached
/// tasks whose errors are logged, never propagated back to the caller that
/// triggered the transition.
pub enum Listener {
    Sync(Arc<dyn Fn(EngagementState, EngagementState) -> Result<(), String> + Send + Sync>),
    Async(Arc<dyn Fn(EngagementState, EngagementState) -> BoxFuture + Send + Sync>),
}

pub struct EngagementStateMachine {
    engagement_id: String,
    current_state: EngagementState,
    history: Vec<(EngagementState, DateTime<Utc>)>,
    listeners: Vec<Listener>,
}

impl EngagementStateMachine {
    pub fn new(engagement_id: impl Into<String>) -> Self {
        let engagement_id = engagement_id.into();
        Self {
            engagement_id,
            current_state: EngagementState::Initializing,
            history: vec![(EngagementState::Initializing, Utc::now())],
            listeners: Vec::new(),
        }
    }

    pub fn engagement_id(&self) -> &str {
        &self.engagement_id
    }

    pub fn current_state(&self) -> EngagementState {
        self.current_state
    }

    pub fn history(&self) -> &[(EngagementState, DateTime<Utc>)] {
        &self.history
    }

    pub fn add_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn transition(&mut self, to: EngagementState) -> Result<(), InvalidStateTransition> {
        let from = self.current_state;
        if !is_valid_transition(from, to) {
            return Err(InvalidStateTransition {
                engagement_id: self.engagement_id.clone(),
                from,
                to,
            });
        }

        self.current_state = to;
        self.history.push((to, Utc::now()));

        info!(
            engagement_id = %self.engagement_id,
            from = %from,
            to = %to,
            "engagement state changed"
        );

        self.notify_listeners(from, to);
        Ok(())
    }

    fn notify_listeners(&self, from: EngagementState, to: EngagementState) {
        for listener in &self.listeners {
            match listener {
                Listener::Sync(callback) => {
                    if let Err(error) = callback(from, to) {
                        warn!(
                            engagement_id = %self.engagement_id,
                            error,
                            "state listener error"
                        );
                    }
                }
                Listener::Async(callback) => {
                    let fut = callback(from, to);
                    let engagement_id = self.engagement_id.clone();
                    tokio::spawn(async move {
                        if let Err(error) = fut.await {
                            warn!(engagement_id = %engagement_id, error, async_task = true, "state listener error");
                        }
                    });
                }
            }
        }
    }

    pub fn start(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(EngagementState::Running)
    }

    pub fn pause(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(EngagementState::Paused)
    }

    pub fn resume(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(EngagementState::Running)
    }

    pub fn stop(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(EngagementState::Stopped)
    }

    pub fn complete(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(EngagementState::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn happy_path_lifecycle() {
        let mut sm = EngagementStateMachine::new("ministry-2025");
        sm.start().unwrap();
        assert_eq!(sm.current_state(), EngagementState::Running);
        sm.pause().unwrap();
        assert_eq!(sm.current_state(), EngagementState::Paused);
        sm.resume().unwrap();
        sm.stop().unwrap();
        assert_eq!(sm.current_state(), EngagementState::Stopped);
        sm.complete().unwrap();
        assert_eq!(sm.current_state(), EngagementState::Completed);
        assert_eq!(sm.history().len(), 6);
    }

    #[test]
    fn rejects_invalid_transition() {
        let mut sm = EngagementStateMachine::new("ministry-2025");
        let err = sm.stop().unwrap_err();
        assert_eq!(err.from, EngagementState::Initializing);
        assert_eq!(err.to, EngagementState::Stopped);
    }

    #[test]
    fn sync_listener_runs_inline() {
        let mut sm = EngagementStateMachine::new("ministry-2025");
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        sm.add_listener(Listener::Sync(Arc::new(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })));
        sm.start().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sync_listener_error_does_not_abort_transition() {
        let mut sm = EngagementStateMachine::new("ministry-2025");
        sm.add_listener(Listener::Sync(Arc::new(|_, _| Err("boom".to_string()))));
        assert!(sm.start().is_ok());
        assert_eq!(sm.current_state(), EngagementState::Running);
    }

    #[tokio::test]
    async fn async_listener_is_spawned_as_detached_task() {
        let mut sm = EngagementStateMachine::new("ministry-2025");
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        sm.add_listener(Listener::Async(Arc::new(move |_, _| {
            let calls_clone = calls_clone.clone();
            Box::pin(async move {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })));
        sm.start().unwrap();
        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
