use std::{fmt, path::Path, sync::Arc};

use tracing::debug;

use crate::CoreError;

/// Callback registered with a [`Watch`] service.
///
/// Identity is the identity of the shared closure: clones of one handler
/// are the same subscriber, two handlers built from equal closures are not.
#[derive(Clone)]
pub struct WatchHandler(Arc<dyn Fn() + Send + Sync>);

impl WatchHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self) {
        (self.0)()
    }

    pub fn same(&self, other: &WatchHandler) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for WatchHandler {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for WatchHandler {}

impl fmt::Debug for WatchHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WatchHandler")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// File-change subscription service.
pub trait Watch: Send + Sync + 'static {
    /// Call `handler` whenever a file matching one of `patterns` changes.
    /// Relative patterns are resolved against `cwd`.
    fn start(&self, cwd: &Path, patterns: &[String], handler: WatchHandler) -> Result<(), CoreError>;

    /// Drop every pattern registered under `handler`.
    fn stop(&self, handler: &WatchHandler);
}

/// Watch service that never fires.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWatch;

impl Watch for NoWatch {
    fn start(&self, cwd: &Path, patterns: &[String], _handler: WatchHandler) -> Result<(), CoreError> {
        debug!(target: "loom.core", cwd = %cwd.display(), ?patterns, "file watching disabled");
        Ok(())
    }

    fn stop(&self, _handler: &WatchHandler) {}
}
