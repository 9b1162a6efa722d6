//! Runtime options
//!
//! Deserializable so applications can embed them in their own config files
//! (the dashboard reads them from the `[runtime]` table of `argo.toml`).

use serde::{Deserialize, Serialize};

/// Topic the store broadcasts every write on
pub const STATE_CHANGE_TOPIC: &str = "state:change";

/// Options shared by the bus, store and components of one [`Runtime`](crate::runtime::Runtime)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Include a copy of the whole tree (`fullState`) in every state-change event
    pub broadcast_full_state: bool,
    /// Topic used for the global state-change event
    pub state_change_topic: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            broadcast_full_state: true,
            state_change_topic: STATE_CHANGE_TOPIC.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the full-tree copy in state-change events
    pub fn without_full_state(mut self) -> Self {
        self.broadcast_full_state = false;
        self
    }
}
