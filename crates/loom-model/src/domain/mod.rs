mod action;
pub use action::Action;

mod argument;
pub use argument::{Argument, Scalar, expand_arguments};

mod config;
pub use config::{
    Config, ConfigFile, DEFAULT_RUNTIME_MS, DEFAULT_TIMEOUT_MS, TaskConfig, TaskDecl,
};

mod env;
pub use env::{EnvSpec, EnvValue, SEEDED_VARS, resolve_env};

mod signal;
pub use signal::Signal;

mod slot_status;
pub use slot_status::SlotStatus;

mod snapshot;
pub use snapshot::{GroupStatus, SlotInfo};

/// Name of a task group (identity key in the registry).
pub type GroupName = String;

/// Index of a slot inside its group.
pub type SlotId = usize;

/// Duration value in milliseconds.
pub type TimeoutMs = u64;

/// Exit code recorded for a slot whose process could not be spawned.
pub const SPAWN_FAILURE_CODE: i32 = -1;
