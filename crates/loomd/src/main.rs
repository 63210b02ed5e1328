use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::Parser;
use loom_api::{HttpApi, SupervisorApiAdapter, axum};
use loom_core::{Supervisor, SupervisorOptions, Watch, WatchHandler};
use loom_exec::TokioLauncher;
use loom_observe::logger_init;
use loom_watch::NotifyWatch;
use tokio::{net::TcpListener, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod cli;
mod reload;
mod signals;

use cli::Cli;
use reload::Trigger;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger_init(&cli.logger())?;

    let code = serve(cli).await?;
    info!(code, "loomd exiting");
    std::process::exit(code);
}

async fn serve(cli: Cli) -> anyhow::Result<i32> {
    let config = std::fs::canonicalize(&cli.config)
        .with_context(|| format!("cannot resolve {}", cli.config.display()))?;
    let dir = config
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", config.display()))?
        .to_path_buf();
    let file = config
        .file_name()
        .ok_or_else(|| anyhow!("{} is not a file", config.display()))?
        .to_string_lossy()
        .into_owned();

    let watch = Arc::new(NotifyWatch::new().context("file watcher")?);
    let options = SupervisorOptions::default().with_interpreter(cli.interpreter());
    let (mut supervisor, handle) = Supervisor::builder(options)
        .with_launcher(Arc::new(TokioLauncher::new()))
        .with_watch(watch.clone())
        .build()?;

    let text = std::fs::read_to_string(&config)
        .with_context(|| format!("cannot read {}", config.display()))?;
    supervisor
        .upgrade(&text, Some(config.as_path()))
        .with_context(|| format!("invalid configuration in {}", config.display()))?;
    info!(config = %config.display(), "configuration loaded");

    let token = CancellationToken::new();
    let (reload_tx, reload_rx) = mpsc::unbounded_channel();

    let file_changed = {
        let tx = reload_tx.clone();
        WatchHandler::new(move || {
            let _ = tx.send(Trigger::FileChanged);
        })
    };
    watch.start(&dir, &[file], file_changed.clone())?;

    let reloader = tokio::spawn(reload::run(handle.clone(), config.clone(), reload_rx, token.clone()));
    let signals = tokio::spawn({
        let (handle, token) = (handle.clone(), token.clone());
        async move {
            if let Err(e) = signals::run(handle, reload_tx, token).await {
                error!(error = %e, "signal handling unavailable");
            }
        }
    });

    let server = match cli.listen {
        Some(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("cannot listen on {addr}"))?;
            info!(%addr, "HTTP API listening");

            let router = HttpApi::new(Arc::new(SupervisorApiAdapter::new(handle.clone()))).router();
            let shutdown = token.clone().cancelled_owned();
            Some(tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(shutdown).await {
                    error!(error = %e, "HTTP API failed");
                }
            }))
        }
        None => None,
    };

    let code = supervisor.run().await;

    token.cancel();
    watch.stop(&file_changed);
    for task in [Some(reloader), Some(signals), server].into_iter().flatten() {
        if let Err(e) = task.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }
    Ok(code)
}
