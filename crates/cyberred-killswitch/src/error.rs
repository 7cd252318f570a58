use thiserror::Error;

#[derive(Error, Debug)]
#[error("kill switch triggered for engagement '{engagement_id}': {reason}")]
pub struct KillSwitchTriggered {
    pub engagement_id: String,
    pub reason: String,
}
