use thiserror::Error;

use crate::{GroupName, SlotId};

/// Errors raised while interpreting model values.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown action: {0} (expected: restart|stop|kill)")]
    UnknownAction(String),
    #[error("unknown signal: {0}")]
    UnknownSignal(String),
    #[error("argument #{position} has no value for slot {slot}")]
    MissingArgument { position: usize, slot: SlotId },
}

/// Configuration rejected before anything is applied.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no tasks declared")]
    NoTasks,
    #[error("invalid task name: {0:?}")]
    InvalidName(GroupName),
    #[error("task {task}: source must not be empty")]
    EmptySource { task: GroupName },
    #[error("task {task}: nested array in arguments #{position} should contain {expected} values, got {found}")]
    ArgumentCount {
        task: GroupName,
        position: usize,
        expected: usize,
        found: usize,
    },
    #[error("task {task}: watch patterns must not be empty")]
    EmptyPattern { task: GroupName },
}
