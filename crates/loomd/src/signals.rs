use loom_core::SupervisorHandle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::reload::Trigger;

/// SIGHUP reloads; SIGINT, SIGTERM and Ctrl-C shut down with code 0.
#[cfg(unix)]
pub async fn run(
    handle: SupervisorHandle,
    reload: mpsc::UnboundedSender<Trigger>,
    token: CancellationToken,
) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            _ = sighup.recv() => {
                info!(target: "loom.signal", "SIGHUP received; reloading configuration");
                let _ = reload.send(Trigger::Hangup);
            }
            _ = sigint.recv() => break,
            _ = sigterm.recv() => break,
        }
    }

    shutdown(&handle).await;
    Ok(())
}

#[cfg(not(unix))]
pub async fn run(
    handle: SupervisorHandle,
    _reload: mpsc::UnboundedSender<Trigger>,
    token: CancellationToken,
) -> std::io::Result<()> {
    tokio::select! {
        _ = token.cancelled() => return Ok(()),
        res = tokio::signal::ctrl_c() => res?,
    }
    shutdown(&handle).await;
    Ok(())
}

async fn shutdown(handle: &SupervisorHandle) {
    info!(target: "loom.signal", "shutdown requested");
    if let Err(e) = handle.die(Some(0)).await {
        warn!(target: "loom.signal", error = %e, "shutdown request failed");
    }
}
