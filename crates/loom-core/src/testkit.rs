//! In-memory collaborators for driving the state machine in tests.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use loom_model::Signal;
use tokio::sync::mpsc;

use crate::{
    ChildIo, CoreError, Event, Interpreter, LaunchError, LaunchSpec, Launcher, LogSink,
    SupervisorOptions, Watch, WatchHandler, context::Context,
};

/// Launcher handing out fake pids and recording everything it is asked.
#[derive(Default)]
pub(crate) struct MockLauncher {
    inner: Mutex<LauncherState>,
}

#[derive(Default)]
struct LauncherState {
    next_pid: u32,
    launches: Vec<LaunchSpec>,
    signals: Vec<(u32, Signal)>,
    children: HashMap<u32, ChildIo>,
    failing: HashSet<String>,
}

impl MockLauncher {
    /// Make every launch of `program` fail.
    pub fn fail_program(&self, program: &str) {
        self.inner.lock().unwrap().failing.insert(program.to_string());
    }

    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.inner.lock().unwrap().launches.clone()
    }

    pub fn signals(&self) -> Vec<(u32, Signal)> {
        self.inner.lock().unwrap().signals.clone()
    }

    pub fn signals_for(&self, pid: u32) -> Vec<Signal> {
        self.signals()
            .into_iter()
            .filter(|(p, _)| *p == pid)
            .map(|(_, s)| s)
            .collect()
    }

    /// Let `pid` exit the way a real process would report it.
    pub fn exit(&self, pid: u32, code: Option<i32>, signal: Option<&str>) {
        let io = self.inner.lock().unwrap().children.remove(&pid);
        let io = io.unwrap_or_else(|| panic!("pid {pid} is not running"));
        io.exited(pid, code, signal.map(str::to_string));
    }

    pub fn running(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.inner.lock().unwrap().children.keys().copied().collect();
        pids.sort_unstable();
        pids
    }
}

impl Launcher for MockLauncher {
    fn launch(&self, spec: &LaunchSpec, io: ChildIo) -> Result<u32, LaunchError> {
        let mut inner = self.inner.lock().unwrap();
        inner.launches.push(spec.clone());
        if inner.failing.contains(&spec.program) {
            return Err(LaunchError::Spawn(format!("{}: not found", spec.program)));
        }
        inner.next_pid += 1;
        let pid = 1000 + inner.next_pid;
        inner.children.insert(pid, io);
        Ok(pid)
    }

    fn signal(&self, pid: u32, signal: Signal) -> Result<(), LaunchError> {
        let mut inner = self.inner.lock().unwrap();
        inner.signals.push((pid, signal));
        if inner.children.contains_key(&pid) {
            Ok(())
        } else {
            Err(LaunchError::Signal {
                pid,
                signal,
                reason: "no such process".into(),
            })
        }
    }
}

/// Watch service remembering subscriptions instead of touching files.
#[derive(Default)]
pub(crate) struct MockWatch {
    inner: Mutex<WatchState>,
}

#[derive(Default)]
struct WatchState {
    starts: Vec<(PathBuf, Vec<String>, WatchHandler)>,
    active: Vec<WatchHandler>,
    stops: usize,
}

impl MockWatch {
    pub fn starts(&self) -> Vec<(PathBuf, Vec<String>)> {
        let inner = self.inner.lock().unwrap();
        inner.starts.iter().map(|(c, p, _)| (c.clone(), p.clone())).collect()
    }

    pub fn handlers(&self) -> Vec<WatchHandler> {
        let inner = self.inner.lock().unwrap();
        inner.starts.iter().map(|(_, _, h)| h.clone()).collect()
    }

    pub fn active(&self) -> Vec<WatchHandler> {
        self.inner.lock().unwrap().active.clone()
    }

    pub fn stops(&self) -> usize {
        self.inner.lock().unwrap().stops
    }

    /// Simulate a file change seen by every active subscription.
    pub fn fire(&self) {
        for handler in self.active() {
            handler.call();
        }
    }
}

impl Watch for MockWatch {
    fn start(&self, cwd: &Path, patterns: &[String], handler: WatchHandler) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.starts.push((cwd.to_path_buf(), patterns.to_vec(), handler.clone()));
        inner.active.push(handler);
        Ok(())
    }

    fn stop(&self, handler: &WatchHandler) {
        let mut inner = self.inner.lock().unwrap();
        inner.stops += 1;
        inner.active.retain(|h| !h.same(handler));
    }
}

/// Sink collecting lines in memory.
#[derive(Default)]
pub(crate) struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }
}

impl LogSink for MemorySink {
    fn log(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

pub(crate) fn ambient(key: &str) -> Option<String> {
    match key {
        "HOME" => Some("/home/loom".into()),
        "PATH" => Some("/usr/bin:/bin".into()),
        "NODE_PATH" => Some("/opt/node".into()),
        _ => None,
    }
}

pub(crate) fn options() -> SupervisorOptions {
    SupervisorOptions::default()
        .with_cwd("/srv")
        .with_interpreter(Interpreter::default())
        .with_ambient(ambient)
}

/// Context wired to the mocks, for tests below the supervisor.
pub(crate) struct Kit {
    pub ctx: Context,
    pub launcher: Arc<MockLauncher>,
    pub watch: Arc<MockWatch>,
    pub sink: Arc<MemorySink>,
    pub events: mpsc::UnboundedReceiver<Event>,
}

pub(crate) fn kit() -> Kit {
    let launcher = Arc::new(MockLauncher::default());
    let watch = Arc::new(MockWatch::default());
    let sink = Arc::new(MemorySink::default());
    let (tx, events) = mpsc::unbounded_channel();
    let opts = options();

    let ctx = Context {
        launcher: launcher.clone(),
        watch: watch.clone(),
        sink: sink.clone(),
        events: tx,
        interpreter: opts.interpreter,
        ambient: opts.ambient,
    };

    Kit {
        ctx,
        launcher,
        watch,
        sink,
        events,
    }
}
