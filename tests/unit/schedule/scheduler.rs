use super::*;
use std::sync::mpsc::Receiver;
use std::time::Instant;

const WAIT: Duration = Duration::from_secs(5);

/// `on_frame` that reports each start and then blocks until released.
fn gated() -> (impl FnMut() + Send + 'static, Receiver<()>, mpsc::Sender<()>) {
    let (started_tx, started_rx) = mpsc::channel();
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let on_frame = move || {
        let _ = started_tx.send(());
        let _ = gate_rx.recv();
    };
    (on_frame, started_rx, gate_tx)
}

#[test]
fn requests_during_a_frame_collapse_into_one() {
    let mut s = RenderScheduler::default();
    let (on_frame, started, gate) = gated();
    let requester = s.start(on_frame).unwrap();

    assert!(requester.request_frame());
    started.recv_timeout(WAIT).unwrap();

    for _ in 0..5 {
        assert!(requester.request_frame());
    }
    gate.send(()).unwrap();
    gate.send(()).unwrap();
    started.recv_timeout(WAIT).unwrap();

    // Nothing else was pending.
    assert!(started.recv_timeout(Duration::from_millis(50)).is_err());
    assert!(s.stop());

    let stats = s.stats();
    assert_eq!(stats.frames_rendered, 2);
    assert_eq!(stats.requests_coalesced, 4);
}

#[test]
fn requests_from_other_threads_render() {
    let mut s = RenderScheduler::default();
    let (tx, rx) = mpsc::channel();
    s.start(move || {
        let _ = tx.send(thread::current().name().map(str::to_string));
    })
    .unwrap();

    let requester = s.requester().unwrap();
    thread::spawn(move || requester.request_frame())
        .join()
        .unwrap();

    let name = rx.recv_timeout(WAIT).unwrap().unwrap();
    assert!(name.starts_with("glcompose-render-"));
    assert!(s.stop());
}

#[test]
fn stop_waits_at_most_the_grace_period() {
    let mut s = RenderScheduler::new(SchedulerOptions {
        poll_interval: Duration::from_millis(1),
        stop_grace: Duration::from_millis(20),
    });
    let (on_frame, started, gate) = gated();
    s.start(on_frame).unwrap();
    assert!(s.request_frame());
    started.recv_timeout(WAIT).unwrap();

    let t0 = Instant::now();
    assert!(s.stop());
    assert!(t0.elapsed() < Duration::from_secs(2));
    assert!(!s.is_running());
    assert!(!s.request_frame());
    drop(gate);
}

#[test]
fn stop_is_idempotent_and_blocks_new_frames() {
    let mut s = RenderScheduler::default();
    assert!(!s.stop());
    assert!(!s.request_frame());

    let (tx, rx) = mpsc::channel();
    let requester = s
        .start(move || {
            let _ = tx.send(());
        })
        .unwrap();
    assert!(s.is_running());
    assert!(s.stop());
    assert!(!s.stop());

    requester.request_frame();
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    assert_eq!(s.stats().frames_rendered, 0);
}

#[test]
fn double_start_is_rejected() {
    let mut s = RenderScheduler::default();
    s.start(|| {}).unwrap();
    let err = s.start(|| {}).unwrap_err();
    assert!(matches!(err, CompositeError::Scheduler(_)));
    assert!(err.to_string().starts_with("scheduler error:"));
}

#[test]
fn restart_after_timed_out_stop_never_overlaps_frames() {
    use std::sync::atomic::AtomicUsize;

    let opts = SchedulerOptions {
        poll_interval: Duration::from_millis(1),
        stop_grace: Duration::from_millis(10),
    };
    let mut s = RenderScheduler::new(opts);
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let frame = {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        move || {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(60));
            active.fetch_sub(1, Ordering::SeqCst);
        }
    };

    let old = s.start(frame.clone()).unwrap();
    assert!(old.request_frame());
    let t0 = Instant::now();
    while active.load(Ordering::SeqCst) == 0 && t0.elapsed() < WAIT {
        thread::sleep(Duration::from_millis(1));
    }
    // The in-flight frame outlives the grace period.
    assert!(s.stop());

    let new = s.start(frame).unwrap();
    assert!(s.is_running());
    for _ in 0..3 {
        old.request_frame();
        new.request_frame();
        thread::sleep(Duration::from_millis(70));
    }
    assert!(s.stop());
    thread::sleep(Duration::from_millis(100));

    assert_eq!(peak.load(Ordering::SeqCst), 1);
}
