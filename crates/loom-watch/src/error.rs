use loom_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("cannot watch {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("notify: {0}")]
    Notify(#[from] notify::Error),
}

impl From<WatchError> for CoreError {
    fn from(e: WatchError) -> Self {
        CoreError::Watch(e.to_string())
    }
}
