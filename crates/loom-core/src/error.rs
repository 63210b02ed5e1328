use loom_model::{ConfigError, ModelError, Signal};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("task {0} was not found")]
    TargetNotFound(String),

    #[error("watch error: {0}")]
    Watch(String),

    #[error("launcher is not configured")]
    MissingLauncher,

    #[error("supervisor is shutting down")]
    ShuttingDown,

    #[error("supervisor is gone")]
    Closed,
}

/// Failures of the process control primitive.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{0}")]
    Spawn(String),

    #[error("failed to deliver {signal} to {pid}: {reason}")]
    Signal {
        pid: u32,
        signal: Signal,
        reason: String,
    },

    #[error("unsupported on this platform: {0}")]
    Unsupported(String),
}
