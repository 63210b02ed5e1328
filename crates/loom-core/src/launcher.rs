use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use loom_model::{GroupName, Signal, SlotId};
use tokio::sync::mpsc;

use crate::{Event, LaunchError, LogSink};

/// Fully resolved process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Complete child environment; nothing else is inherited.
    pub env: BTreeMap<String, String>,
}

/// Process control primitive used by the slot state machine.
///
/// Implementations must not block: output forwarding and exit observation
/// happen in the background and are reported through the [`ChildIo`].
pub trait Launcher: Send + Sync + 'static {
    /// Start a process and return its pid.
    fn launch(&self, spec: &LaunchSpec, io: ChildIo) -> Result<u32, LaunchError>;

    /// Deliver `signal` to `pid`.
    fn signal(&self, pid: u32, signal: Signal) -> Result<(), LaunchError>;
}

/// Per-child channel back into the supervisor.
///
/// Output lines go to the log sink with the pid/name prefix, the exit is
/// posted as an [`Event::Exited`] on the supervisor loop.
#[derive(Clone)]
pub struct ChildIo {
    group: GroupName,
    slot: SlotId,
    sink: Arc<dyn LogSink>,
    events: mpsc::UnboundedSender<Event>,
}

impl ChildIo {
    pub fn new(
        group: impl Into<GroupName>,
        slot: SlotId,
        sink: Arc<dyn LogSink>,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            group: group.into(),
            slot,
            sink,
            events,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn stdout(&self, pid: u32, line: &str) {
        if !line.is_empty() {
            self.sink.log(&format!("{pid} ({}) {line}", self.group));
        }
    }

    pub fn stderr(&self, pid: u32, line: &str) {
        if !line.is_empty() {
            self.sink.log(&format!("{pid} [{}] {line}", self.group));
        }
    }

    /// Report the exit of `pid`. Returns `false` if the supervisor is gone.
    pub fn exited(&self, pid: u32, code: Option<i32>, signal: Option<String>) -> bool {
        self.events
            .send(Event::Exited {
                group: self.group.clone(),
                slot: self.slot,
                pid,
                code,
                signal,
            })
            .is_ok()
    }
}
