#![cfg(unix)]

use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use loom_core::{ChildIo, Event, LaunchError, LaunchSpec, Launcher, LogSink};
use loom_exec::TokioLauncher;
use loom_model::Signal;
use tokio::sync::mpsc;

#[derive(Default)]
struct Lines(Mutex<Vec<String>>);

impl LogSink for Lines {
    fn log(&self, line: &str) {
        self.0.lock().unwrap().push(line.to_string());
    }
}

impl Lines {
    fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Lines may trail the exit event by a little; wait for `n` of them.
    async fn at_least(&self, n: usize) -> Vec<String> {
        for _ in 0..200 {
            let lines = self.all();
            if lines.len() >= n {
                return lines;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.all()
    }
}

struct Harness {
    launcher: TokioLauncher,
    sink: Arc<Lines>,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Harness {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            launcher: TokioLauncher::new(),
            sink: Arc::new(Lines::default()),
            tx,
            rx,
        }
    }

    fn io(&self) -> ChildIo {
        ChildIo::new("t", 0, self.sink.clone(), self.tx.clone())
    }

    fn launch(&self, spec: &LaunchSpec) -> Result<u32, LaunchError> {
        self.launcher.launch(spec, self.io())
    }

    async fn exit(&mut self) -> (u32, Option<i32>, Option<String>) {
        let event = tokio::time::timeout(Duration::from_secs(10), self.rx.recv())
            .await
            .expect("child did not exit in time")
            .expect("channel closed");
        match event {
            Event::Exited {
                pid, code, signal, ..
            } => (pid, code, signal),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

fn sh(script: &str) -> LaunchSpec {
    let mut env = BTreeMap::new();
    env.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
    LaunchSpec {
        program: "/bin/sh".into(),
        args: vec!["-c".into(), script.into()],
        cwd: PathBuf::from("/"),
        env,
    }
}

#[tokio::test]
async fn forwards_output_and_reports_exit_code() {
    let mut h = Harness::new();
    let pid = h.launch(&sh("echo hello; echo oops >&2; echo; exit 3")).unwrap();

    let (exited, code, signal) = h.exit().await;

    assert_eq!(exited, pid);
    assert_eq!(code, Some(3));
    assert_eq!(signal, None);

    let lines = h.sink.at_least(2).await;
    assert!(lines.contains(&format!("{pid} (t) hello")));
    assert!(lines.contains(&format!("{pid} [t] oops")));
    assert_eq!(lines.len(), 2);
}

#[tokio::test]
async fn environment_is_exactly_the_given_one() {
    let mut h = Harness::new();
    let mut spec = sh(r#"echo "${LOOM_TEST}:${HOME:-none}""#);
    spec.env.insert("LOOM_TEST".into(), "on".into());

    let pid = h.launch(&spec).unwrap();
    h.exit().await;

    assert_eq!(h.sink.at_least(1).await, vec![format!("{pid} (t) on:none")]);
}

#[tokio::test]
async fn runs_in_the_given_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::new();
    let mut spec = sh("pwd -P");
    spec.cwd = dir.path().to_path_buf();

    let pid = h.launch(&spec).unwrap();
    h.exit().await;

    let expected = dir.path().canonicalize().unwrap();
    assert_eq!(h.sink.at_least(1).await, vec![format!("{pid} (t) {}", expected.display())]);
}

#[tokio::test]
async fn interrupt_is_reported_as_signal() {
    let mut h = Harness::new();
    let pid = h.launch(&sh("exec sleep 30")).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    h.launcher.signal(pid, Signal::Interrupt).unwrap();
    let (_, code, signal) = h.exit().await;

    assert_eq!(code, None);
    assert_eq!(signal.as_deref(), Some("SIGINT"));
}

#[tokio::test]
async fn missing_program_fails_to_spawn() {
    let h = Harness::new();
    let mut spec = sh("");
    spec.program = "/nonexistent/loom-worker".into();

    let err = h.launch(&spec).unwrap_err();
    assert!(matches!(err, LaunchError::Spawn(_)));
}

#[tokio::test]
async fn signalling_a_reaped_process_fails() {
    let mut h = Harness::new();
    let pid = h.launch(&sh("exit 0")).unwrap();
    let (_, code, _) = h.exit().await;
    assert_eq!(code, Some(0));

    let err = h.launcher.signal(pid, Signal::Terminate).unwrap_err();
    assert!(matches!(err, LaunchError::Signal { pid: p, .. } if p == pid));
}

#[tokio::test]
async fn exit_is_reported_while_a_descendant_holds_output() {
    let mut h = Harness::new();
    let pid = h.launch(&sh("echo started; sleep 5 & exit 3")).unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), h.rx.recv()).await;
    let Ok(Some(Event::Exited { pid: exited, code, .. })) = event else {
        panic!("exit was not reported while output stayed open: {event:?}");
    };
    assert_eq!((exited, code), (pid, Some(3)));

    // The pid is gone; the caller saw the exit before any chance to signal it.
    assert!(h.launcher.signal(pid, Signal::Terminate).is_err());
    assert_eq!(h.sink.at_least(1).await, vec![format!("{pid} (t) started")]);
}
