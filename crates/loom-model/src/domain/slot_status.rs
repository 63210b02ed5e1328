use serde::{Deserialize, Serialize};

/// Lifecycle state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotStatus {
    /// Cell allocated, process not live yet.
    New,
    /// Process is running.
    Working,
    /// A respawn was requested; the exit that follows is expected.
    Restarting,
    /// Exited with a non-zero code (or failed to spawn).
    Error,
    /// Exited cleanly with code zero.
    Done,
    /// Terminated by a signal.
    Stopped,
}

impl SlotStatus {
    /// Classify an exit that was not requested through a restart.
    ///
    /// A non-zero code wins over a signal; a signal without a failing code
    /// counts as stopped; anything else is a clean exit.
    pub fn from_exit(code: Option<i32>, signal: Option<&str>) -> Self {
        match (code, signal) {
            (Some(c), _) if c != 0 => SlotStatus::Error,
            (_, Some(_)) => SlotStatus::Stopped,
            _ => SlotStatus::Done,
        }
    }
}
