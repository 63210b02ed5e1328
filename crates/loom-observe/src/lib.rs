//! Logging setup shared by the loom binaries.
//!
//! Task output reaches the log through the `loom.task` target, so the
//! format chosen here is also the format of every supervised process line.

mod logger;
pub use logger::*;
