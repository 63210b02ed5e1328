use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{Ambient, Event, Interpreter, Launcher, LogSink, Watch};

/// Collaborators shared by every group of one supervisor.
#[derive(Clone)]
pub(crate) struct Context {
    pub launcher: Arc<dyn Launcher>,
    pub watch: Arc<dyn Watch>,
    pub sink: Arc<dyn LogSink>,
    pub events: mpsc::UnboundedSender<Event>,
    pub interpreter: Interpreter,
    pub ambient: Ambient,
}

impl Context {
    pub fn log(&self, line: impl AsRef<str>) {
        self.sink.log(line.as_ref());
    }
}
