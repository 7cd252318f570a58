//! Engagement records — the persistent shape of a coordination session.
//!
//! The valid state set and transition table live in `cyberred-state`; this
//! crate only carries the record shape so that `cyberred-checkpoint` and
//! `cyberred-session` can share it without a dependency on the state machine
//! crate's transition logic.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::validate::validate_uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub id: String,
    pub name: String,
    pub scope_hash: String,
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
    pub config_path: String,
    pub scope_path: String,
}

impl Engagement {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        name: String,
        scope_hash: String,
        state: String,
        created_at: String,
        updated_at: String,
        config_path: String,
        scope_path: String,
    ) -> Result<Self> {
        validate_uuid(&id, "id")?;
        Ok(Self {
            id,
            name,
            scope_hash,
            state,
            created_at,
            updated_at,
            config_path,
            scope_path,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let engagement: Self = serde_json::from_str(data)?;
        validate_uuid(&engagement.id, "id")?;
        Ok(engagement)
    }
}
