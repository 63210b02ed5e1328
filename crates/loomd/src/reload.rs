use std::{path::PathBuf, time::Duration};

use loom_core::{CoreError, SupervisorHandle};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Editors emit bursts of events per save; collapse them.
const SETTLE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    FileChanged,
    Hangup,
}

/// Re-read `path` and submit it to the supervisor on every trigger.
pub async fn run(
    handle: SupervisorHandle,
    path: PathBuf,
    mut triggers: mpsc::UnboundedReceiver<Trigger>,
    token: CancellationToken,
) {
    loop {
        let trigger = tokio::select! {
            _ = token.cancelled() => break,
            t = triggers.recv() => match t {
                Some(t) => t,
                None => break,
            },
        };

        tokio::time::sleep(SETTLE).await;
        while triggers.try_recv().is_ok() {}

        debug!(target: "loom.reload", ?trigger, path = %path.display(), "reloading configuration");
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                warn!(target: "loom.reload", path = %path.display(), error = %e, "cannot read configuration");
                continue;
            }
        };

        match handle.upgrade(text, Some(path.clone())).await {
            Ok(()) => info!(target: "loom.reload", path = %path.display(), "configuration applied"),
            Err(CoreError::ShuttingDown | CoreError::Closed) => break,
            // Rejections are already reported by the supervisor.
            Err(e) => debug!(target: "loom.reload", error = %e, "configuration rejected"),
        }
    }
}
