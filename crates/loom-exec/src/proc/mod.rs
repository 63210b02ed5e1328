use loom_core::{ChildIo, LaunchError, LaunchSpec, Launcher};
use loom_model::Signal;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, trace, warn};

use crate::{
    error::ExecError,
    util::{command, exit_parts, send_signal},
};

/// Launcher backed by `tokio::process`.
///
/// Each child gets two line readers (stdout, stderr) and a waiter task.
/// The waiter lets the readers reach end of output while the process is
/// still unreaped, and reports the exit through [`ChildIo::exited`] the
/// moment the process is reaped. Output held open by a descendant keeps
/// being forwarded after that.
#[derive(Debug, Clone, Default)]
pub struct TokioLauncher;

impl TokioLauncher {
    pub fn new() -> Self {
        Self
    }

    fn spawn(&self, spec: &LaunchSpec, io: ChildIo) -> Result<u32, ExecError> {
        trace!(target: "loom.exec", program = %spec.program, args = ?spec.args, cwd = %spec.cwd.display(), "spawn");

        let mut child = command(spec).spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| ExecError::Spawn("process exited before reporting a pid".into()))?;

        let stdout = child.stdout.take().ok_or(ExecError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(ExecError::MissingPipe("stderr"))?;

        let out = tokio::spawn(forward(BufReader::new(stdout).lines(), io.clone(), pid, Stream::Out));
        let err = tokio::spawn(forward(BufReader::new(stderr).lines(), io.clone(), pid, Stream::Err));

        tokio::spawn(async move {
            let readers = async {
                let _ = out.await;
                let _ = err.await;
            };
            tokio::pin!(readers);

            // Reaping frees the pid; the slot must learn about it right away.
            let reaped = tokio::select! {
                biased;
                _ = &mut readers => None,
                status = child.wait() => Some(status),
            };
            let status = match reaped {
                Some(status) => {
                    debug!(target: "loom.exec", pid, "exited before its output closed");
                    status
                }
                None => child.wait().await,
            };

            let (code, signal) = match status {
                Ok(status) => exit_parts(&status),
                Err(e) => {
                    warn!(target: "loom.exec", pid, error = %e, "wait failed");
                    (None, None)
                }
            };
            debug!(target: "loom.exec", pid, ?code, ?signal, group = io.group(), "exited");
            io.exited(pid, code, signal);
        });

        Ok(pid)
    }
}

impl Launcher for TokioLauncher {
    fn launch(&self, spec: &LaunchSpec, io: ChildIo) -> Result<u32, LaunchError> {
        self.spawn(spec, io).map_err(LaunchError::from)
    }

    fn signal(&self, pid: u32, signal: Signal) -> Result<(), LaunchError> {
        trace!(target: "loom.exec", pid, %signal, "signal");
        send_signal(pid, signal).map_err(LaunchError::from)
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Out,
    Err,
}

async fn forward<R>(mut lines: Lines<R>, io: ChildIo, pid: u32, stream: Stream)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match stream {
                Stream::Out => io.stdout(pid, &line),
                Stream::Err => io.stderr(pid, &line),
            },
            Ok(None) => break,
            Err(e) => {
                debug!(target: "loom.exec", pid, ?stream, error = %e, "output stream closed");
                break;
            }
        }
    }
}
