use tracing::info;

/// Destination of child output and lifecycle notices.
pub trait LogSink: Send + Sync + 'static {
    fn log(&self, line: &str);
}

/// Sink that turns every line into a `tracing` event on target `loom.task`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, line: &str) {
        info!(target: "loom.task", "{line}");
    }
}
