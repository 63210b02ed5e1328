mod builder;
pub use builder::SupervisorBuilder;


use std::{
    collections::BTreeMap,
    ops::ControlFlow,
    path::{Path, PathBuf},
    time::Duration,
};

use loom_model::{Action, Config, GroupName, GroupStatus, Signal};
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    CoreError, DieRequest, Event, Request, SupervisorOptions, context::Context, group::TaskGroup,
};

/// Exit code of `die` when the caller gives none.
pub const DEFAULT_EXIT_CODE: i32 = 1;

/// Shortest time `die` leaves children to exit.
const MIN_DIE_WAIT: Duration = Duration::from_millis(100);

/// Registry of task groups and the single loop that drives them.
///
/// All state lives here and is only touched from [`Supervisor::run`] (or
/// directly by the owner when driving it by hand): exits, stop deadlines,
/// watch notifications and operator requests arrive as [`Event`]s.
pub struct Supervisor {
    ctx: Context,
    cwd: PathBuf,
    groups: BTreeMap<GroupName, TaskGroup>,
    config: Option<Config>,
    events: mpsc::UnboundedReceiver<Event>,
}

impl Supervisor {
    pub fn builder(options: SupervisorOptions) -> SupervisorBuilder {
        SupervisorBuilder::new(options)
    }

    /// Last configuration accepted by [`Supervisor::upgrade`] or [`Supervisor::apply`].
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Parse configuration text and reconcile every group against it.
    ///
    /// Relative paths resolve against the directory of `origin`, or the
    /// supervisor's working directory for text without a file. A rejected
    /// configuration leaves running groups untouched.
    pub fn upgrade(&mut self, text: &str, origin: Option<&Path>) -> Result<(), CoreError> {
        let base = self.base_dir(origin);
        match Config::parse(text, &base) {
            Ok(config) => {
                info!(target: "loom.core", base = %base.display(), tasks = config.tasks.len(), "configuration accepted");
                self.apply(config);
                Ok(())
            }
            Err(e) => {
                warn!(target: "loom.core", error = %e, "configuration rejected");
                self.ctx.log(format!("Config error: {e}"));
                Err(e.into())
            }
        }
    }

    fn base_dir(&self, origin: Option<&Path>) -> PathBuf {
        match origin.and_then(Path::parent) {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) if !dir.as_os_str().is_empty() => self.cwd.join(dir),
            _ => self.cwd.clone(),
        }
    }

    /// Reconcile against an already validated configuration.
    ///
    /// Declared groups are created or upgraded; groups missing from
    /// `config` start draining and disappear once their last process exits.
    pub fn apply(&mut self, config: Config) {
        for params in &config.tasks {
            match self.groups.get_mut(&params.name) {
                Some(group) => group.upgrade(&self.ctx, params.clone()),
                None => {
                    debug!(target: "loom.core", group = %params.name, "creating task group");
                    let group = TaskGroup::new(&self.ctx, params.clone());
                    self.groups.insert(params.name.clone(), group);
                }
            }
        }

        for (name, group) in self.groups.iter_mut() {
            if !config.contains(name) && !group.is_draining() {
                info!(target: "loom.core", group = %name, "task group left the configuration");
                group.drain(&self.ctx);
            }
        }

        self.collect();
        self.config = Some(config);
    }

    /// Snapshot of every group, draining ones included.
    pub fn status(&self) -> Vec<GroupStatus> {
        self.groups.values().map(TaskGroup::status).collect()
    }

    /// Dispatch an operator action.
    ///
    /// `target` is a group name, a pid owned by any group, or `None` for
    /// every group. `kill` takes its signal from `args[0]` (SIGTERM when
    /// absent); the other actions ignore `args`.
    pub fn command(&mut self, action: Action, target: Option<&str>, args: &[String]) -> Result<(), CoreError> {
        let signal = match (action, args.first()) {
            (Action::Kill, Some(name)) => name.parse::<Signal>()?,
            _ => Signal::Terminate,
        };
        debug!(target: "loom.core", %action, ?target, %signal, "command");

        match target {
            None => {
                for group in self.groups.values_mut() {
                    group.command(&self.ctx, action, signal);
                }
            }
            Some(name) if self.groups.contains_key(name) => {
                if let Some(group) = self.groups.get_mut(name) {
                    group.command(&self.ctx, action, signal);
                }
            }
            Some(target) => {
                let pid = target.trim().parse::<u32>().ok().filter(|pid| *pid != 0);
                let owner = pid.and_then(|pid| {
                    self.groups
                        .values_mut()
                        .find(|g| g.owns(pid))
                        .map(|g| (g, pid))
                });
                match owner {
                    Some((group, pid)) => {
                        group.command_pid(&self.ctx, pid, action, signal);
                    }
                    None => {
                        self.ctx.log(format!("Task {target} was not found"));
                        return Err(CoreError::TargetNotFound(target.to_string()));
                    }
                }
            }
        }
        Ok(())
    }

    /// React to one loop event.
    ///
    /// A die request is handed back as [`ControlFlow::Break`]; the caller
    /// runs [`Supervisor::die`] and answers it.
    pub fn handle_event(&mut self, event: Event) -> ControlFlow<DieRequest> {
        match event {
            Event::Exited {
                group,
                slot,
                pid,
                code,
                signal,
            } => {
                if let Some(g) = self.groups.get_mut(&group) {
                    g.on_exit(&self.ctx, slot, pid, code, signal);
                }
                self.collect();
            }
            Event::StopDeadline { group, slot, pid } => {
                if let Some(g) = self.groups.get(&group) {
                    g.on_deadline(&self.ctx, slot, pid);
                }
            }
            Event::WatchFired { group } => {
                if let Some(g) = self.groups.get_mut(&group)
                    && !g.is_draining()
                {
                    debug!(target: "loom.core", %group, "watched files changed");
                    g.restart_all(&self.ctx);
                }
            }
            Event::Request(request) => return self.serve(request),
        }
        ControlFlow::Continue(())
    }

    fn serve(&mut self, request: Request) -> ControlFlow<DieRequest> {
        match request {
            Request::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Request::Command {
                action,
                target,
                args,
                reply,
            } => {
                let _ = reply.send(self.command(action, target.as_deref(), &args));
            }
            Request::Upgrade {
                text,
                origin,
                reply,
            } => {
                let _ = reply.send(self.upgrade(&text, origin.as_deref()));
            }
            Request::Die(request) => return ControlFlow::Break(request),
        }
        ControlFlow::Continue(())
    }

    /// Shut everything down and return the exit code.
    ///
    /// Every group stops respawning and receives a graceful stop; exits
    /// keep being processed for the longest configured timeout (at least
    /// 100ms) before the code is returned.
    pub async fn die(&mut self, code: Option<i32>) -> i32 {
        let code = code.unwrap_or(DEFAULT_EXIT_CODE);
        let grace = self
            .groups
            .values()
            .map(|g| g.params().timeout())
            .max()
            .unwrap_or_default()
            .max(MIN_DIE_WAIT);
        info!(target: "loom.core", code, grace_ms = grace.as_millis() as u64, "shutting down");

        for group in self.groups.values_mut() {
            group.drain(&self.ctx);
        }
        self.collect();

        let deadline = Instant::now() + grace;
        let mut waiting = Vec::new();
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                Some(event) = self.events.recv() => match event {
                    Event::Request(Request::Die(request)) => waiting.push(request.reply),
                    Event::Request(request) => self.refuse(request),
                    event => {
                        let _ = self.handle_event(event);
                    }
                },
            }
        }

        self.ctx.log(format!("Terminated with code {code}"));
        for reply in waiting {
            let _ = reply.send(code);
        }
        code
    }

    fn refuse(&self, request: Request) {
        match request {
            Request::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Request::Command { reply, .. } | Request::Upgrade { reply, .. } => {
                let _ = reply.send(Err(CoreError::ShuttingDown));
            }
            Request::Die(request) => {
                let _ = request.reply.send(DEFAULT_EXIT_CODE);
            }
        }
    }

    /// Drive the event loop until a die request completes.
    pub async fn run(mut self) -> i32 {
        info!(target: "loom.core", groups = self.groups.len(), "supervisor loop started");
        while let Some(event) = self.events.recv().await {
            if let ControlFlow::Break(request) = self.handle_event(event) {
                let code = self.die(request.code).await;
                let _ = request.reply.send(code);
                return code;
            }
        }
        self.die(None).await
    }

    /// Drop groups that finished draining.
    fn collect(&mut self) {
        let ctx = &self.ctx;
        self.groups.retain(|name, group| {
            if !group.is_drained() {
                return true;
            }
            ctx.watch.stop(group.handler());
            ctx.log(format!("Task group {name} drained and removed"));
            false
        });
    }
}
