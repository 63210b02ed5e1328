//! Data model of the loom process supervisor.
//!
//! Everything here is plain data plus pure functions: the configuration
//! schema and its validation, environment and argument templating, slot
//! states and the status snapshots handed out to callers.

mod domain;
pub use domain::*;

mod error;
pub use error::{ConfigError, ModelError};
