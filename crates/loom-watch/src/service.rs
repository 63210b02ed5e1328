use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use loom_core::{CoreError, Watch, WatchHandler};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

use crate::{Pattern, WatchError};

/// [`Watch`] implementation on top of the platform's native notifier.
///
/// Subscriptions are keyed by handler identity; watched directories are
/// reference counted so overlapping patterns share one OS watch.
pub struct NotifyWatch {
    registry: Arc<Mutex<Registry>>,
    watcher: Mutex<RecommendedWatcher>,
}

#[derive(Default)]
struct Registry {
    subs: Vec<Subscription>,
    roots: HashMap<PathBuf, usize>,
}

struct Subscription {
    handler: WatchHandler,
    /// Canonical root of each pattern.
    matchers: Vec<(PathBuf, Pattern)>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NotifyWatch {
    pub fn new() -> Result<Self, WatchError> {
        let registry = Arc::new(Mutex::new(Registry::default()));
        let events = Arc::clone(&registry);

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => dispatch(&events, &event),
            Err(e) => warn!(target: "loom.watch", error = %e, "watch error"),
        })?;

        Ok(Self {
            registry,
            watcher: Mutex::new(watcher),
        })
    }

    fn subscribe(&self, cwd: &Path, patterns: &[String], handler: WatchHandler) -> Result<(), WatchError> {
        let mut matchers = Vec::with_capacity(patterns.len());
        for glob in patterns {
            let pattern = Pattern::new(cwd, glob)?;
            let root = pattern.base.canonicalize().map_err(|source| WatchError::Io {
                path: pattern.base.display().to_string(),
                source,
            })?;
            matchers.push((root, pattern));
        }

        // `dispatch` runs on the notifier thread that also serves
        // watch/unwatch: never hold `registry` across those calls.
        let mut watcher = lock(&self.watcher);

        let mut fresh: Vec<PathBuf> = {
            let registry = lock(&self.registry);
            matchers
                .iter()
                .map(|(root, _)| root.clone())
                .filter(|root| !registry.roots.contains_key(root))
                .collect()
        };
        fresh.sort();
        fresh.dedup();

        for (i, root) in fresh.iter().enumerate() {
            if let Err(e) = watcher.watch(root, RecursiveMode::Recursive) {
                for root in &fresh[..i] {
                    unwatch(&mut watcher, root);
                }
                return Err(e.into());
            }
            debug!(target: "loom.watch", root = %root.display(), "watching");
        }

        let mut registry = lock(&self.registry);
        for (root, _) in &matchers {
            *registry.roots.entry(root.clone()).or_insert(0) += 1;
        }
        registry.subs.push(Subscription { handler, matchers });
        Ok(())
    }
}

fn unwatch(watcher: &mut RecommendedWatcher, root: &Path) {
    if let Err(e) = watcher.unwatch(root) {
        debug!(target: "loom.watch", root = %root.display(), error = %e, "unwatch failed");
    }
}

/// Call every handler with a pattern matching one of the event's paths.
fn dispatch(registry: &Mutex<Registry>, event: &Event) {
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }

    let handlers: Vec<WatchHandler> = {
        let registry = lock(registry);
        registry
            .subs
            .iter()
            .filter(|sub| {
                event.paths.iter().any(|path| {
                    sub.matchers
                        .iter()
                        .any(|(root, pattern)| pattern.matches(root, path))
                })
            })
            .map(|sub| sub.handler.clone())
            .collect()
    };

    if !handlers.is_empty() {
        trace!(target: "loom.watch", paths = ?event.paths, kind = ?event.kind, count = handlers.len(), "change");
    }
    for handler in handlers {
        handler.call();
    }
}

impl Watch for NotifyWatch {
    fn start(&self, cwd: &Path, patterns: &[String], handler: WatchHandler) -> Result<(), CoreError> {
        self.subscribe(cwd, patterns, handler).map_err(CoreError::from)
    }

    fn stop(&self, handler: &WatchHandler) {
        let mut watcher = lock(&self.watcher);

        let released: Vec<PathBuf> = {
            let mut registry = lock(&self.registry);
            let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut registry.subs)
                .into_iter()
                .partition(|sub| sub.handler.same(handler));
            registry.subs = kept;

            let mut released = Vec::new();
            for (root, _) in gone.iter().flat_map(|sub| &sub.matchers) {
                let Some(refs) = registry.roots.get_mut(root) else {
                    continue;
                };
                *refs = refs.saturating_sub(1);
                if *refs == 0 {
                    registry.roots.remove(root);
                    released.push(root.clone());
                }
            }
            released
        };

        for root in &released {
            unwatch(&mut watcher, root);
        }
    }
}
