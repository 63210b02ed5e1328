//! File-change subscriptions for loom task groups.
//!
//! Patterns are shell globs (`*`, `**`, `?`, `[..]`, `{a,b}`) resolved
//! against the group's working directory. Each pattern watches its static
//! base directory recursively; events are matched against the compiled
//! pattern before the group's handler is called.

mod error;
pub use error::WatchError;

mod pattern;
pub use pattern::Pattern;

mod service;
pub use service::NotifyWatch;
