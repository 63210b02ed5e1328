use std::process::ExitStatus;

use loom_core::LaunchSpec;
use loom_model::Signal;
use tokio::process::Command;

use crate::error::ExecError;

/// Command for `spec`: explicit environment only, no stdin, piped output.
pub(crate) fn command(spec: &LaunchSpec) -> Command {
    use std::process::Stdio;

    let mut cmd = Command::new(&spec.program);
    cmd.args(spec.args.iter().map(|s| s.as_str()))
        .current_dir(&spec.cwd)
        .env_clear()
        .envs(&spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use nix::{sys::signal, unistd::Pid};

        fn to_nix(sig: Signal) -> signal::Signal {
            match sig {
                Signal::Hangup => signal::Signal::SIGHUP,
                Signal::Interrupt => signal::Signal::SIGINT,
                Signal::Quit => signal::Signal::SIGQUIT,
                Signal::Kill => signal::Signal::SIGKILL,
                Signal::User1 => signal::Signal::SIGUSR1,
                Signal::User2 => signal::Signal::SIGUSR2,
                Signal::Terminate => signal::Signal::SIGTERM,
            }
        }

        pub(crate) fn send_signal(pid: u32, sig: Signal) -> Result<(), ExecError> {
            let raw = i32::try_from(pid).map_err(|_| ExecError::InvalidPid(pid))?;
            signal::kill(Pid::from_raw(raw), to_nix(sig)).map_err(|e| ExecError::Signal {
                pid,
                signal: sig,
                reason: e.desc().to_string(),
            })
        }

        /// Exit code and terminating signal name of a finished process.
        pub(crate) fn exit_parts(status: &ExitStatus) -> (Option<i32>, Option<String>) {
            use std::os::unix::process::ExitStatusExt;

            let signal = status.signal().map(|raw| {
                signal::Signal::try_from(raw)
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_else(|_| format!("SIG{raw}"))
            });
            (status.code(), signal)
        }
    } else {
        pub(crate) fn send_signal(_pid: u32, _sig: Signal) -> Result<(), ExecError> {
            Err(ExecError::Unsupported)
        }

        pub(crate) fn exit_parts(status: &ExitStatus) -> (Option<i32>, Option<String>) {
            (status.code(), None)
        }
    }
}
