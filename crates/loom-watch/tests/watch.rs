#![cfg(unix)]

use std::{
    fs,
    sync::mpsc::{self, Receiver},
    time::Duration,
};

use loom_core::{Watch, WatchHandler};
use loom_watch::NotifyWatch;

const FIRE: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(500);

fn handler() -> (WatchHandler, Receiver<()>) {
    let (tx, rx) = mpsc::channel();
    let handler = WatchHandler::new(move || {
        let _ = tx.send(());
    });
    (handler, rx)
}

fn drain(rx: &Receiver<()>) {
    while rx.recv_timeout(QUIET).is_ok() {}
}

#[test]
fn matching_change_calls_the_handler() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("lib")).unwrap();
    let watch = NotifyWatch::new().unwrap();
    let (h, rx) = handler();

    watch.start(dir.path(), &["lib/**/*.js".into()], h).unwrap();
    fs::write(dir.path().join("lib/index.js"), "module.exports = 1;\n").unwrap();

    assert!(rx.recv_timeout(FIRE).is_ok(), "no notification for lib/index.js");
}

#[test]
fn unrelated_change_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let watch = NotifyWatch::new().unwrap();
    let (h, rx) = handler();

    watch.start(dir.path(), &["*.js".into()], h).unwrap();
    fs::write(dir.path().join("notes.txt"), "hello\n").unwrap();

    assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn stopped_handler_is_not_called() {
    let dir = tempfile::tempdir().unwrap();
    let watch = NotifyWatch::new().unwrap();
    let (h, rx) = handler();

    watch.start(dir.path(), &["*.js".into()], h.clone()).unwrap();
    fs::write(dir.path().join("a.js"), "1\n").unwrap();
    assert!(rx.recv_timeout(FIRE).is_ok());
    drain(&rx);

    watch.stop(&h);
    fs::write(dir.path().join("b.js"), "2\n").unwrap();
    assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn shared_root_survives_one_unsubscribe() {
    let dir = tempfile::tempdir().unwrap();
    let watch = NotifyWatch::new().unwrap();
    let (first, _first_rx) = handler();
    let (second, second_rx) = handler();

    watch.start(dir.path(), &["*.js".into()], first.clone()).unwrap();
    watch.start(dir.path(), &["*.js".into()], second).unwrap();
    watch.stop(&first);

    fs::write(dir.path().join("c.js"), "3\n").unwrap();
    assert!(second_rx.recv_timeout(FIRE).is_ok());
}

#[test]
fn missing_base_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let watch = NotifyWatch::new().unwrap();
    let (h, _rx) = handler();

    let err = watch.start(dir.path(), &["absent/*.js".into()], h);
    assert!(err.is_err());
}

#[test]
fn subscriptions_change_while_events_arrive() {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread,
    };

    let busy = tempfile::tempdir().unwrap();
    let other = tempfile::tempdir().unwrap();
    let watch = Arc::new(NotifyWatch::new().unwrap());
    let (h, _rx) = handler();
    watch.start(busy.path(), &["*.js".into()], h).unwrap();

    let running = Arc::new(AtomicBool::new(true));
    let writer = {
        let (running, path) = (running.clone(), busy.path().join("hot.js"));
        thread::spawn(move || {
            let mut n = 0u64;
            while running.load(Ordering::Relaxed) {
                let _ = fs::write(&path, n.to_string());
                n += 1;
            }
        })
    };

    let (done_tx, done_rx) = mpsc::channel();
    let churn = {
        let (watch, dir) = (watch.clone(), other.path().to_path_buf());
        thread::spawn(move || {
            for _ in 0..500 {
                let (h, _rx) = handler();
                watch.start(&dir, &["*.js".into()], h.clone()).unwrap();
                watch.stop(&h);
            }
            let _ = done_tx.send(());
        })
    };

    let finished = done_rx.recv_timeout(Duration::from_secs(60)).is_ok();
    running.store(false, Ordering::Relaxed);
    writer.join().unwrap();
    assert!(finished, "subscription changes stalled under load");
    churn.join().unwrap();
}
