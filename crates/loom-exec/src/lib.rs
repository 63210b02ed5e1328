//! Process control for loom on top of `tokio::process`.

mod error;
pub use error::ExecError;

mod util;

pub mod proc;
pub use proc::TokioLauncher;
