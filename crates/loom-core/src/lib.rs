//! Supervision core: slots, task groups and the registry event loop.
//!
//! Process control, file watching and log output are reached through the
//! [`Launcher`], [`Watch`] and [`LogSink`] traits so the state machine can
//! be driven by real processes or by an in-memory test kit alike.

mod error;
pub use error::{CoreError, LaunchError};

mod event;
pub use event::{DieRequest, Event, Request};

mod launcher;
pub use launcher::{ChildIo, LaunchSpec, Launcher};

mod watch;
pub use watch::{NoWatch, Watch, WatchHandler};

mod sink;
pub use sink::{LogSink, TracingSink};

mod options;
pub use options::{Ambient, Interpreter, SupervisorOptions};

mod context;
mod fields;
mod group;
mod slot;

pub mod supervisor;
pub use supervisor::{Supervisor, SupervisorBuilder};

mod handle;
pub use handle::SupervisorHandle;

#[cfg(test)]
mod testkit;
