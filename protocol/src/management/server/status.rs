use serde::{Deserialize, Serialize};

/// Lifecycle state of one server process.
///
/// Valid transitions:
/// `Stopped -> Starting -> Running -> Stopping -> Stopped`, with
/// `Error` reachable from `Starting` or `Running`/`Stopping` on
/// unrecoverable failure and left only by an explicit reset. A force
/// kill lands on `Stopped` from any transitioning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

impl ServerState {
    /// Derived, never stored independently: true iff the state is
    /// `Starting` or `Stopping`.
    pub fn is_transitioning(self) -> bool {
        matches!(self, ServerState::Starting | ServerState::Stopping)
    }
}
