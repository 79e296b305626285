use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::foundation::error::{CompositeError, CompositeResult};

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// How often the worker wakes to check for requests and shutdown.
    pub poll_interval: Duration,
    /// Upper bound `stop` waits for an in-flight frame.
    pub stop_grace: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            stop_grace: Duration::from_millis(20),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub frames_rendered: u64,
    /// Requests folded into an already pending one.
    pub requests_coalesced: u64,
}

#[derive(Debug, Default)]
struct Shared {
    /// Held for the duration of a frame, across every worker this scheduler started.
    frame_gate: Mutex<()>,
    frames: AtomicU64,
    coalesced: AtomicU64,
}

/// Cloneable handle for asking a [`RenderScheduler`] for a frame from any thread.
#[derive(Clone, Debug)]
pub struct FrameRequester {
    tx: mpsc::SyncSender<()>,
    shared: Arc<Shared>,
}

impl FrameRequester {
    /// Ask for one frame. Requests made before the worker picks the pending one up collapse into
    /// it. Returns `false` once the worker is gone.
    pub fn request_frame(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                self.shared.coalesced.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(())) => false,
        }
    }
}

struct Worker {
    /// Cleared by `stop`. Each start gets its own, so a detached worker never resumes.
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    done_rx: mpsc::Receiver<()>,
    name: String,
}

/// Runs frames on a dedicated render thread, one at a time, whenever a frame was requested.
///
/// The pending-request slot holds a single request: any number of requests before the next tick
/// produce one frame, and a request arriving while a frame runs produces exactly one more.
pub struct RenderScheduler {
    opts: SchedulerOptions,
    shared: Arc<Shared>,
    requester: Option<FrameRequester>,
    worker: Option<Worker>,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new(SchedulerOptions::default())
    }
}

impl RenderScheduler {
    pub fn new(opts: SchedulerOptions) -> Self {
        Self {
            opts,
            shared: Arc::new(Shared::default()),
            requester: None,
            worker: None,
        }
    }

    pub fn options(&self) -> SchedulerOptions {
        self.opts
    }

    /// Spawn the render thread. `on_frame` runs on that thread for every frame.
    pub fn start<F>(&mut self, mut on_frame: F) -> CompositeResult<FrameRequester>
    where
        F: FnMut() + Send + 'static,
    {
        if self.worker.is_some() {
            return Err(CompositeError::scheduler("scheduler already started"));
        }

        let (tx, rx) = mpsc::sync_channel::<()>(1);
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let shared = Arc::clone(&self.shared);
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = Arc::clone(&running);
        let poll = self.opts.poll_interval.max(Duration::from_micros(100));
        let name = format!(
            "glcompose-render-{}",
            NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed)
        );

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while worker_running.load(Ordering::SeqCst) {
                    match rx.recv_timeout(poll) {
                        Ok(()) => {
                            let _frame = shared
                                .frame_gate
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner);
                            if !worker_running.load(Ordering::SeqCst) {
                                break;
                            }
                            on_frame();
                            shared.frames.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                let _ = done_tx.send(());
            })
            .map_err(|e| CompositeError::scheduler(format!("failed to spawn render thread: {e}")))?;

        tracing::debug!(thread = %name, "render scheduler started");
        let requester = FrameRequester {
            tx,
            shared: Arc::clone(&self.shared),
        };
        self.requester = Some(requester.clone());
        self.worker = Some(Worker {
            running,
            handle,
            done_rx,
            name,
        });
        Ok(requester)
    }

    /// Ask for a frame. `false` when the scheduler is not running.
    pub fn request_frame(&self) -> bool {
        self.is_running() && self.requester.as_ref().is_some_and(FrameRequester::request_frame)
    }

    /// A requester for other threads; `None` before `start`.
    pub fn requester(&self) -> Option<FrameRequester> {
        self.requester.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.running.load(Ordering::SeqCst))
    }

    /// Stop scheduling frames and wait up to `stop_grace` for one in flight.
    ///
    /// Returns whether a running scheduler was stopped. A frame that outlives the grace period is
    /// left to finish on its own thread.
    pub fn stop(&mut self) -> bool {
        self.requester = None;
        let Some(worker) = self.worker.take() else {
            return false;
        };
        let was_running = worker.running.swap(false, Ordering::SeqCst);

        match worker.done_rx.recv_timeout(self.opts.stop_grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    tracing::warn!(thread = %worker.name, "render thread panicked");
                }
                tracing::debug!(thread = %worker.name, "render scheduler stopped");
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    thread = %worker.name,
                    grace_ms = self.opts.stop_grace.as_millis() as u64,
                    "frame still running after stop grace period, detaching render thread"
                );
            }
        }
        was_running
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            frames_rendered: self.shared.frames.load(Ordering::Relaxed),
            requests_coalesced: self.shared.coalesced.load(Ordering::Relaxed),
        }
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/scheduler.rs"]
mod tests;
