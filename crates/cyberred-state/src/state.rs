use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngagementState {
    Initializing,
    Running,
    Paused,
    Stopped,
    Completed,
}

impl fmt::Display for EngagementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngagementState::Initializing => "INITIALIZING",
            EngagementState::Running => "RUNNING",
            EngagementState::Paused => "PAUSED",
            EngagementState::Stopped => "STOPPED",
            EngagementState::Completed => "COMPLETED",
        };
        f.write_str(s)
    }
}

/// The fixed transition table from spec.md §3/§4.J:
/// `INITIALIZING→RUNNING; RUNNING↔PAUSED; RUNNING→STOPPED; PAUSED→STOPPED;
/// STOPPED→COMPLETED`.
const VALID_TRANSITIONS: &[(EngagementState, EngagementState)] = &[
    (EngagementState::Initializing, EngagementState::Running),
    (EngagementState::Running, EngagementState::Paused),
    (EngagementState::Running, EngagementState::Stopped),
    (EngagementState::Paused, EngagementState::Running),
    (EngagementState::Paused, EngagementState::Stopped),
    (EngagementState::Stopped, EngagementState::Completed),
];

pub fn is_valid_transition(from: EngagementState, to: EngagementState) -> bool {
    VALID_TRANSITIONS.contains(&(from, to))
}

pub fn valid_targets(from: EngagementState) -> HashSet<EngagementState> {
    VALID_TRANSITIONS
        .iter()
        .filter(|(f, _)| *f == from)
        .map(|(_, t)| *t)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializing_only_goes_to_running() {
        assert_eq!(
            valid_targets(EngagementState::Initializing),
            HashSet::from([EngagementState::Running])
        );
    }

    #[test]
    fn running_pauses_and_stops() {
        assert_eq!(
            valid_targets(EngagementState::Running),
            HashSet::from([EngagementState::Paused, EngagementState::Stopped])
        );
    }

    #[test]
    fn completed_is_terminal() {
        assert!(valid_targets(EngagementState::Completed).is_empty());
    }

    #[test]
    fn rejects_skip_ahead() {
        assert!(!is_valid_transition(
            EngagementState::Initializing,
            EngagementState::Stopped
        ));
    }
}
