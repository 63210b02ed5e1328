use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    CoreError, Launcher, LogSink, NoWatch, Supervisor, SupervisorHandle, SupervisorOptions,
    TracingSink, Watch, context::Context,
};

/// Wires collaborators into a [`Supervisor`].
///
/// A launcher is mandatory; file watching defaults to [`NoWatch`] and log
/// output to [`TracingSink`].
pub struct SupervisorBuilder {
    options: SupervisorOptions,
    launcher: Option<Arc<dyn Launcher>>,
    watch: Arc<dyn Watch>,
    sink: Arc<dyn LogSink>,
}

impl SupervisorBuilder {
    pub fn new(options: SupervisorOptions) -> Self {
        Self {
            options,
            launcher: None,
            watch: Arc::new(NoWatch),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_watch(mut self, watch: Arc<dyn Watch>) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn build(self) -> Result<(Supervisor, SupervisorHandle), CoreError> {
        let launcher = self.launcher.ok_or(CoreError::MissingLauncher)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let ctx = Context {
            launcher,
            watch: self.watch,
            sink: self.sink,
            events: tx.clone(),
            interpreter: self.options.interpreter,
            ambient: self.options.ambient,
        };

        let supervisor = Supervisor {
            ctx,
            cwd: self.options.cwd,
            groups: Default::default(),
            config: None,
            events: rx,
        };
        Ok((supervisor, SupervisorHandle::new(tx)))
    }
}
