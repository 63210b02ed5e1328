use std::{collections::BTreeMap, path::Path, time::Duration};

use loom_model::{
    SPAWN_FAILURE_CODE, Signal, SlotId, SlotInfo, SlotStatus, TaskConfig, expand_arguments,
    resolve_env,
};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::{ChildIo, Event, LaunchSpec, context::Context};

/// One worker cell of a task group, backed by at most one process.
#[derive(Debug)]
pub(crate) struct Slot {
    pub id: SlotId,
    /// `0` when no live process backs the slot.
    pub pid: u32,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub status: SlotStatus,
    pub start: Instant,
    pub code: Option<i32>,
    pub signal: Option<String>,
}

/// What to do with a slot whose process just exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Respawn,
    /// Flapping guard: the process lived shorter than `runtime`.
    Skip { elapsed: Duration },
    Leave,
}

/// Status after an exit. A pending restart survives the exit untouched.
pub(crate) fn classify(current: SlotStatus, code: Option<i32>, signal: Option<&str>) -> SlotStatus {
    if current == SlotStatus::Restarting {
        return current;
    }
    SlotStatus::from_exit(code, signal)
}

/// Respawn policy, evaluated after [`classify`].
pub(crate) fn decide(
    status: SlotStatus,
    draining: bool,
    persistent: bool,
    code: Option<i32>,
    elapsed: Duration,
    runtime: Duration,
) -> Decision {
    if draining {
        return Decision::Leave;
    }
    if status == SlotStatus::Restarting {
        return Decision::Respawn;
    }
    if persistent && code.is_some_and(|c| c != 0) {
        if elapsed < runtime {
            return Decision::Skip { elapsed };
        }
        return Decision::Respawn;
    }
    Decision::Leave
}

impl Slot {
    /// Start a process for cell `id` with the group's current parameters.
    ///
    /// Never fails: a process that cannot be started yields a slot in
    /// `Error` state with the spawn failure code and no pid.
    pub fn spawn(ctx: &Context, params: &TaskConfig, id: SlotId) -> Slot {
        let search_path = if params.executable {
            None
        } else {
            ctx.interpreter.search_path_var.as_deref()
        };
        let env = resolve_env(|key| (ctx.ambient)(key), &params.env, search_path);

        let mut slot = Slot {
            id,
            pid: 0,
            args: Vec::new(),
            env,
            status: SlotStatus::New,
            start: Instant::now(),
            code: None,
            signal: None,
        };

        let args = match expand_arguments(&params.arguments, id) {
            Ok(args) => args,
            Err(e) => {
                slot.fail(ctx, &params.name, &e.to_string());
                return slot;
            }
        };
        slot.args = args;

        let spec = launch_spec(ctx, params, &slot.args, &slot.env);
        trace!(target: "loom.core", group = %params.name, slot = id, program = %spec.program, args = ?spec.args, "launch");

        let io = ChildIo::new(params.name.clone(), id, ctx.sink.clone(), ctx.events.clone());
        match ctx.launcher.launch(&spec, io) {
            Ok(pid) => {
                slot.pid = pid;
                slot.status = SlotStatus::Working;
                slot.start = Instant::now();
                ctx.log(format!("Task {pid} ({}) spawned", params.name));
            }
            Err(e) => slot.fail(ctx, &params.name, &e.to_string()),
        }
        slot
    }

    /// Cell reserved for `id` with no process yet.
    pub fn pending(id: SlotId) -> Slot {
        Slot {
            id,
            pid: 0,
            args: Vec::new(),
            env: BTreeMap::new(),
            status: SlotStatus::New,
            start: Instant::now(),
            code: None,
            signal: None,
        }
    }

    fn fail(&mut self, ctx: &Context, name: &str, reason: &str) {
        self.pid = 0;
        self.status = SlotStatus::Error;
        self.code = Some(SPAWN_FAILURE_CODE);
        ctx.log(format!("Failed to spawn task ({name}): {reason}"));
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.pid != 0
    }

    /// SIGINT now, SIGTERM after `timeout` if the same process is still there.
    pub fn stop(&self, ctx: &Context, name: &str, timeout: Duration) {
        if !self.is_live() {
            return;
        }
        self.kill(ctx, name, Signal::Interrupt);

        let events = ctx.events.clone();
        let group = name.to_string();
        let (slot, pid) = (self.id, self.pid);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = events.send(Event::StopDeadline { group, slot, pid });
        });
    }

    /// Deliver `signal` right away. Failures are logged and swallowed.
    pub fn kill(&self, ctx: &Context, name: &str, signal: Signal) {
        if !self.is_live() {
            return;
        }
        if let Err(e) = ctx.launcher.signal(self.pid, signal) {
            debug!(target: "loom.core", pid = self.pid, %signal, error = %e, "signal delivery failed");
            ctx.log(format!("Failed to kill {} ({name}) with {signal}", self.pid));
        }
    }

    /// Escalation step of [`Slot::stop`]; a no-op once `pid` has exited.
    pub fn escalate(&self, ctx: &Context, name: &str, pid: u32) {
        if self.is_live() && self.pid == pid {
            self.kill(ctx, name, Signal::Terminate);
        }
    }

    /// Record the exit of the backing process.
    pub fn exited(&mut self, ctx: &Context, name: &str, code: Option<i32>, signal: Option<String>) {
        let pid = self.pid;
        match (&signal, code) {
            (Some(sig), None) => ctx.log(format!("Task {pid} ({name}) was killed by {sig}")),
            _ => ctx.log(format!("Task {pid} ({name}) exited with code {}", code.unwrap_or(0))),
        }

        self.pid = 0;
        self.status = classify(self.status, code, signal.as_deref());
        self.code = code;
        self.signal = signal;
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn info(&self) -> SlotInfo {
        SlotInfo {
            id: self.id,
            pid: self.pid,
            args: self.args.clone(),
            status: self.status,
            uptime_ms: self
                .is_live()
                .then(|| u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)),
            code: self.code,
            signal: self.signal.clone(),
        }
    }
}

fn launch_spec(
    ctx: &Context,
    params: &TaskConfig,
    args: &[String],
    env: &BTreeMap<String, String>,
) -> LaunchSpec {
    let (program, args) = if params.executable {
        (resolve_source(&params.cwd, &params.source, true), args.to_vec())
    } else {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(resolve_source(&params.cwd, &params.source, false));
        argv.extend_from_slice(args);
        (ctx.interpreter.program.clone(), argv)
    };

    LaunchSpec {
        program,
        args,
        cwd: params.cwd.clone(),
        env: env.clone(),
    }
}

/// Bare executable names stay untouched so `PATH` lookup applies.
fn resolve_source(cwd: &Path, source: &str, executable: bool) -> String {
    let path = Path::new(source);
    if path.is_absolute() || (executable && !source.contains('/')) {
        return source.to_string();
    }
    cwd.join(path).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn restarting_survives_the_exit() {
        assert_eq!(
            classify(SlotStatus::Restarting, Some(1), None),
            SlotStatus::Restarting
        );
        assert_eq!(classify(SlotStatus::Working, Some(1), None), SlotStatus::Error);
        assert_eq!(
            classify(SlotStatus::Working, None, Some("SIGINT")),
            SlotStatus::Stopped
        );
        assert_eq!(classify(SlotStatus::Working, Some(0), None), SlotStatus::Done);
    }

    #[test]
    fn draining_never_respawns() {
        let d = decide(SlotStatus::Restarting, true, true, Some(1), 2 * SEC, SEC);
        assert_eq!(d, Decision::Leave);
    }

    #[test]
    fn restart_wins_over_everything() {
        let ms = Duration::from_millis(5);
        assert_eq!(decide(SlotStatus::Restarting, false, false, Some(0), ms, SEC), Decision::Respawn);
        assert_eq!(decide(SlotStatus::Restarting, false, true, Some(1), ms, SEC), Decision::Respawn);
        assert_eq!(decide(SlotStatus::Restarting, false, false, None, ms, SEC), Decision::Respawn);
    }

    #[test]
    fn persistent_dirty_exit_respects_runtime() {
        let short = Duration::from_millis(200);
        assert_eq!(
            decide(SlotStatus::Error, false, true, Some(1), short, SEC),
            Decision::Skip { elapsed: short }
        );
        assert_eq!(decide(SlotStatus::Error, false, true, Some(1), SEC, SEC), Decision::Respawn);
        assert_eq!(decide(SlotStatus::Error, false, false, Some(1), 2 * SEC, SEC), Decision::Leave);
    }

    #[test]
    fn clean_and_signalled_exits_are_left_alone() {
        assert_eq!(decide(SlotStatus::Done, false, true, Some(0), 2 * SEC, SEC), Decision::Leave);
        assert_eq!(decide(SlotStatus::Stopped, false, true, None, 2 * SEC, SEC), Decision::Leave);
    }

    #[test]
    fn source_resolution() {
        let cwd = Path::new("/srv/app");
        assert_eq!(resolve_source(cwd, "worker", true), "worker");
        assert_eq!(resolve_source(cwd, "./bin/worker", true), "/srv/app/./bin/worker");
        assert_eq!(resolve_source(cwd, "/usr/bin/env", true), "/usr/bin/env");
        assert_eq!(resolve_source(cwd, "index.js", false), "/srv/app/index.js");
    }
}
