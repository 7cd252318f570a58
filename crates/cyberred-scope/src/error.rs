use thiserror::Error;

#[derive(Error, Debug)]
#[error("scope violation: target={target:?} command={command:?} rule={rule}")]
pub struct ScopeViolationError {
    pub target: Option<String>,
    pub command: Option<String>,
    pub rule: String,
}
