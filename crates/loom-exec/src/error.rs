use loom_core::LaunchError;
use loom_model::Signal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("missing {0} pipe")]
    MissingPipe(&'static str),
    #[error("pid {0} is out of range")]
    InvalidPid(u32),
    #[error("failed to deliver {signal} to {pid}: {reason}")]
    Signal {
        pid: u32,
        signal: Signal,
        reason: String,
    },
    #[error("signals are not supported on this platform")]
    Unsupported,
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Spawn(e.to_string())
    }
}

impl From<ExecError> for LaunchError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Signal {
                pid,
                signal,
                reason,
            } => LaunchError::Signal {
                pid,
                signal,
                reason,
            },
            ExecError::Unsupported => LaunchError::Unsupported("signals".into()),
            other => LaunchError::Spawn(other.to_string()),
        }
    }
}
