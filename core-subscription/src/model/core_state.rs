use serde::{Deserialize, Serialize};

/// Connectivity state of a core client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoreState {
    #[default]
    Initial,
    Connecting,
    Connected,
    Offline,
    Faulted,
    Disposed,
}

impl CoreState {
    /// Whether subscriptions can be started while the client is in this state.
    pub fn accepts_requests(self) -> bool {
        !matches!(self, CoreState::Faulted | CoreState::Disposed)
    }
}

/// A transition of the core client, raised only when the state actually changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreStateChange {
    pub old_state: CoreState,
    pub new_state: CoreState,
}

impl CoreStateChange {
    pub fn new(old_state: CoreState, new_state: CoreState) -> Self {
        Self {
            old_state,
            new_state,
        }
    }
}
