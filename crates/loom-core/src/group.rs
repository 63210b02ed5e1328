use loom_model::{Action, GroupStatus, Signal, SlotId, SlotStatus, TaskConfig};
use tracing::{debug, warn};

use crate::{
    Event, WatchHandler,
    context::Context,
    fields::reconcile,
    slot::{Decision, Slot, decide},
};

/// Named pool of slots reconciled against its [`TaskConfig`].
pub(crate) struct TaskGroup {
    params: TaskConfig,
    /// Cells `0..count`, contiguous.
    slots: Vec<Slot>,
    /// Slots popped by a count reduction, kept until their process exits.
    retired: Vec<Slot>,
    /// Removed from the configuration; never respawns again.
    draining: bool,
    handler: WatchHandler,
}

impl TaskGroup {
    /// Create the group and bring it up to `params`.
    pub fn new(ctx: &Context, params: TaskConfig) -> Self {
        let handler = {
            let events = ctx.events.clone();
            let group = params.name.clone();
            WatchHandler::new(move || {
                let _ = events.send(Event::WatchFired {
                    group: group.clone(),
                });
            })
        };

        let mut group = Self {
            params: TaskConfig {
                watch: Vec::new(),
                ..params.clone()
            },
            slots: Vec::new(),
            retired: Vec::new(),
            draining: false,
            handler,
        };
        group.upgrade(ctx, params);
        group
    }

    pub fn params(&self) -> &TaskConfig {
        &self.params
    }

    pub fn handler(&self) -> &WatchHandler {
        &self.handler
    }

    /// Converge running slots onto `new` with as little disruption as possible.
    pub fn upgrade(&mut self, ctx: &Context, new: TaskConfig) {
        let diff = reconcile(&mut self.params, &new);

        // Declared again while draining: whatever the drain stopped comes back.
        if std::mem::take(&mut self.draining) {
            for slot in &mut self.slots {
                slot.status = SlotStatus::Restarting;
            }
        }

        self.trim(ctx);

        if diff.restart {
            ctx.log(format!("Restart required for {} task group", self.params.name));
            self.restart_all(ctx);
        }

        if diff.resubscribe {
            ctx.watch.stop(&self.handler);
            if !self.params.watch.is_empty()
                && let Err(e) = ctx.watch.start(&self.params.cwd, &self.params.watch, self.handler.clone())
            {
                warn!(target: "loom.core", group = %self.params.name, error = %e, "watch subscription failed");
            }
        }

        self.fill(ctx);
    }

    /// Spawn into every empty cell and every dead cell awaiting a restart.
    ///
    /// A cell whose id still belongs to a live retired process only gets a
    /// placeholder; it is filled once that process exits.
    fn fill(&mut self, ctx: &Context) {
        for id in 0..self.params.count {
            let blocked = self.blocked(id);
            match self.slots.get(id) {
                None if blocked => self.slots.push(Slot::pending(id)),
                None => {
                    let slot = Slot::spawn(ctx, &self.params, id);
                    self.slots.push(slot);
                }
                Some(slot)
                    if !blocked
                        && !slot.is_live()
                        && matches!(slot.status, SlotStatus::Restarting | SlotStatus::New) =>
                {
                    self.slots[id] = Slot::spawn(ctx, &self.params, id);
                }
                Some(_) => {}
            }
        }
    }

    /// A retired process still runs under `id`.
    fn blocked(&self, id: SlotId) -> bool {
        self.retired.iter().any(|s| s.id == id && s.is_live())
    }

    /// Stop and retire cells beyond `count`.
    fn trim(&mut self, ctx: &Context) {
        while self.slots.len() > self.params.count {
            let Some(slot) = self.slots.pop() else { break };
            debug!(target: "loom.core", group = %self.params.name, slot = slot.id, pid = slot.pid, "retiring slot");
            slot.stop(ctx, &self.params.name, self.params.timeout());
            if slot.is_live() {
                self.retired.push(slot);
            }
        }
    }

    fn restart_slot(&mut self, ctx: &Context, id: SlotId) {
        let Some(slot) = self.slots.get_mut(id) else { return };
        slot.status = SlotStatus::Restarting;
        if slot.is_live() {
            slot.stop(ctx, &self.params.name, self.params.timeout());
        } else if !self.draining && !self.blocked(id) {
            self.slots[id] = Slot::spawn(ctx, &self.params, id);
        }
    }

    pub fn restart_all(&mut self, ctx: &Context) {
        for id in 0..self.slots.len() {
            self.restart_slot(ctx, id);
        }
    }

    pub fn stop_all(&self, ctx: &Context) {
        for slot in self.slots.iter().chain(&self.retired) {
            slot.stop(ctx, &self.params.name, self.params.timeout());
        }
    }

    /// Apply an operator action to every slot of the group.
    pub fn command(&mut self, ctx: &Context, action: Action, signal: Signal) {
        match action {
            Action::Restart => self.restart_all(ctx),
            Action::Stop => self.stop_all(ctx),
            Action::Kill => {
                for slot in self.slots.iter().chain(&self.retired) {
                    slot.kill(ctx, &self.params.name, signal);
                }
            }
        }
    }

    /// Apply an operator action to the slot backed by `pid`.
    ///
    /// Returns `false` when no slot of this group runs `pid`.
    pub fn command_pid(&mut self, ctx: &Context, pid: u32, action: Action, signal: Signal) -> bool {
        if let Some(id) = self.slots.iter().position(|s| s.is_live() && s.pid == pid) {
            match action {
                Action::Restart => self.restart_slot(ctx, id),
                Action::Stop => self.slots[id].stop(ctx, &self.params.name, self.params.timeout()),
                Action::Kill => self.slots[id].kill(ctx, &self.params.name, signal),
            }
            return true;
        }

        // Retired slots are on their way out; a restart only stops them.
        if let Some(slot) = self.retired.iter().find(|s| s.pid == pid) {
            match action {
                Action::Restart | Action::Stop => slot.stop(ctx, &self.params.name, self.params.timeout()),
                Action::Kill => slot.kill(ctx, &self.params.name, signal),
            }
            return true;
        }
        false
    }

    pub fn owns(&self, pid: u32) -> bool {
        pid != 0 && self.slots.iter().chain(&self.retired).any(|s| s.pid == pid)
    }

    /// Handle the exit of `pid` in cell `id` and respawn per policy.
    pub fn on_exit(&mut self, ctx: &Context, id: SlotId, pid: u32, code: Option<i32>, signal: Option<String>) {
        if pid == 0 {
            return;
        }

        if let Some(idx) = self.retired.iter().position(|s| s.pid == pid) {
            let mut slot = self.retired.swap_remove(idx);
            slot.exited(ctx, &self.params.name, code, signal);
            if !self.draining {
                self.fill(ctx);
            }
            return;
        }

        let Some(slot) = self.slots.get_mut(id).filter(|s| s.pid == pid) else {
            debug!(target: "loom.core", group = %self.params.name, slot = id, pid, "exit of unknown process ignored");
            return;
        };

        slot.exited(ctx, &self.params.name, code, signal);
        let decision = decide(
            slot.status,
            self.draining,
            self.params.persistent,
            code,
            slot.elapsed(),
            self.params.runtime(),
        );

        match decision {
            Decision::Respawn => *slot = Slot::spawn(ctx, &self.params, id),
            Decision::Skip { elapsed } => {
                ctx.log(format!(
                    "Restart skipped after {}ms ({})",
                    elapsed.as_millis(),
                    self.params.name
                ));
            }
            Decision::Leave => {}
        }
    }

    /// Stop-timer expiry for `pid`.
    pub fn on_deadline(&self, ctx: &Context, id: SlotId, pid: u32) {
        let slot = self
            .slots
            .get(id)
            .filter(|s| s.pid == pid)
            .or_else(|| self.retired.iter().find(|s| s.pid == pid));
        if let Some(slot) = slot {
            slot.escalate(ctx, &self.params.name, pid);
        }
    }

    /// Leave the configuration: no more respawns, every process stopped.
    pub fn drain(&mut self, ctx: &Context) {
        debug!(target: "loom.core", group = %self.params.name, "draining");
        self.draining = true;
        self.params.persistent = false;
        self.stop_all(ctx);
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    pub fn has_live(&self) -> bool {
        self.slots.iter().chain(&self.retired).any(Slot::is_live)
    }

    /// Draining and nothing left running.
    pub fn is_drained(&self) -> bool {
        self.draining && !self.has_live()
    }

    pub fn status(&self) -> GroupStatus {
        GroupStatus {
            name: self.params.name.clone(),
            count: self.params.count,
            source: self.params.source.clone(),
            persistent: self.params.persistent,
            draining: self.draining,
            subtasks: self.slots.iter().chain(&self.retired).map(Slot::info).collect(),
        }
    }
}
