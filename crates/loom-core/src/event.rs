use std::path::PathBuf;

use loom_model::{Action, GroupName, GroupStatus, SlotId};
use tokio::sync::oneshot;

use crate::CoreError;

/// Everything the supervisor loop reacts to.
#[derive(Debug)]
pub enum Event {
    /// A child process went away.
    Exited {
        group: GroupName,
        slot: SlotId,
        pid: u32,
        code: Option<i32>,
        signal: Option<String>,
    },
    /// Grace period of a stop elapsed; escalate if `pid` is still running.
    StopDeadline {
        group: GroupName,
        slot: SlotId,
        pid: u32,
    },
    /// A watched file of the group changed.
    WatchFired { group: GroupName },
    /// Operator request coming through a [`crate::SupervisorHandle`].
    Request(Request),
}

#[derive(Debug)]
pub enum Request {
    Status {
        reply: oneshot::Sender<Vec<GroupStatus>>,
    },
    Command {
        action: Action,
        target: Option<String>,
        args: Vec<String>,
        reply: oneshot::Sender<Result<(), CoreError>>,
    },
    Upgrade {
        text: String,
        origin: Option<PathBuf>,
        reply: oneshot::Sender<Result<(), CoreError>>,
    },
    Die(DieRequest),
}

/// Shutdown request; the reply carries the final exit code.
#[derive(Debug)]
pub struct DieRequest {
    pub code: Option<i32>,
    pub reply: oneshot::Sender<i32>,
}
