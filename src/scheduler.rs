//! Frame scheduling between capture, landmark inference and rendering.
//!
//! Landmark inference runs on a dedicated worker thread. Frames travel to it
//! over a one-slot channel and results are applied to the
//! [`TrackingSession`] on that same thread, which then publishes a snapshot.
//! At most one request is in flight: frames offered while the worker is busy
//! are dropped, never queued, so latency and memory stay bounded when the
//! model is slower than the camera.

use crate::{
    capture::VideoFrame,
    constants::DEFAULT_SHUTDOWN_GRACE_MS,
    landmarks::LandmarkSource,
    tracking::{TrackingHandle, TrackingSession},
    Error, Result,
};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const REQUEST_CAPACITY: usize = 1;
const EVENT_CAPACITY: usize = 1;

/// What happened to a frame offered to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Sent to the inference worker
    Dispatched,
    /// Dropped because a request is still outstanding
    DroppedBusy,
    /// Dropped because its timestamp matches the last dispatched frame
    DroppedDuplicate,
    /// The landmark source has not finished loading
    NotReady,
    /// The landmark source failed to start
    Unavailable,
    /// The scheduler has been torn down
    ShutDown,
}

/// Request counters
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    pub dispatched: AtomicU64,
    pub dropped_busy: AtomicU64,
    pub dropped_duplicate: AtomicU64,
    pub completed: AtomicU64,
}

impl SchedulerMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
            dropped_duplicate: self.dropped_duplicate.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub dispatched: u64,
    pub dropped_busy: u64,
    pub dropped_duplicate: u64,
    pub completed: u64,
}

/// Flags shared between the scheduler and its worker
#[derive(Default)]
struct WorkerFlags {
    ready: AtomicBool,
    unavailable: AtomicBool,
    in_flight: AtomicBool,
    cancelled: AtomicBool,
}

/// Worker state changes. Waiters re-check the flags on every event, so an
/// event dropped on a full channel loses nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerEvent {
    /// Source initialization finished, successfully or not
    Started,
    /// A request was applied to the session
    Completed,
}

/// Single-flight dispatcher owning the inference worker
pub struct FrameScheduler {
    request_tx: Option<Sender<VideoFrame>>,
    /// Disconnects once the worker has exited
    events: Receiver<WorkerEvent>,
    flags: Arc<WorkerFlags>,
    metrics: Arc<SchedulerMetrics>,
    handle: TrackingHandle,
    last_dispatched_ms: Option<f64>,
    worker: Option<JoinHandle<()>>,
    shutdown_grace: Duration,
}

impl FrameScheduler {
    /// Start the inference worker. The source is initialized on the worker
    /// thread; until that finishes, offered frames report `NotReady`.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn start(source: Box<dyn LandmarkSource>, session: TrackingSession) -> Result<Self> {
        Self::start_with_grace(source, session, Duration::from_millis(DEFAULT_SHUTDOWN_GRACE_MS))
    }

    /// As [`FrameScheduler::start`], with an explicit teardown grace period
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn start_with_grace(
        source: Box<dyn LandmarkSource>,
        session: TrackingSession,
        shutdown_grace: Duration,
    ) -> Result<Self> {
        let (request_tx, request_rx) = bounded(REQUEST_CAPACITY);
        let (event_tx, events) = bounded(EVENT_CAPACITY);
        let flags = Arc::new(WorkerFlags::default());
        let metrics = Arc::new(SchedulerMetrics::default());
        let handle = session.handle();

        let worker = {
            let flags = Arc::clone(&flags);
            let metrics = Arc::clone(&metrics);
            thread::Builder::new()
                .name("landmark-inference".to_string())
                .spawn(move || Self::run_worker(source, session, request_rx, &event_tx, &flags, &metrics))
                .map_err(|e| Error::SchedulerError(format!("Failed to spawn inference worker: {e}")))?
        };

        Ok(Self {
            request_tx: Some(request_tx),
            events,
            flags,
            metrics,
            handle,
            last_dispatched_ms: None,
            worker: Some(worker),
            shutdown_grace,
        })
    }

    fn run_worker(
        mut source: Box<dyn LandmarkSource>,
        mut session: TrackingSession,
        request_rx: Receiver<VideoFrame>,
        events: &Sender<WorkerEvent>,
        flags: &WorkerFlags,
        metrics: &SchedulerMetrics,
    ) {
        info!("Initializing landmark source '{}'", source.name());
        if let Err(e) = source.initialize() {
            session.mark_unavailable(&e.to_string());
            flags.unavailable.store(true, Ordering::Release);
            let _ = events.try_send(WorkerEvent::Started);
            return;
        }
        flags.ready.store(true, Ordering::Release);
        let _ = events.try_send(WorkerEvent::Started);
        info!("Landmark source '{}' ready", source.name());

        while let Ok(frame) = request_rx.recv() {
            if flags.cancelled.load(Ordering::Acquire) {
                break;
            }

            let detection = match source.detect(&frame) {
                Ok(detection) => detection,
                Err(e) => {
                    warn!("Landmark detection failed at {} ms: {e}", frame.timestamp_ms);
                    None
                }
            };

            // A request resolving after teardown must not touch the session
            if flags.cancelled.load(Ordering::Acquire) {
                debug!("Abandoning detection for frame at {} ms", frame.timestamp_ms);
                break;
            }

            session.process(frame.timestamp_ms, detection.as_ref());
            metrics.completed.fetch_add(1, Ordering::Relaxed);
            flags.in_flight.store(false, Ordering::Release);
            let _ = events.try_send(WorkerEvent::Completed);
        }

        debug!("Inference worker exiting");
    }

    /// Offer the current video frame for estimation
    pub fn offer_frame(&mut self, frame: VideoFrame) -> DispatchOutcome {
        let Some(tx) = &self.request_tx else {
            return DispatchOutcome::ShutDown;
        };
        if self.flags.unavailable.load(Ordering::Acquire) {
            return DispatchOutcome::Unavailable;
        }
        if !self.flags.ready.load(Ordering::Acquire) {
            return DispatchOutcome::NotReady;
        }
        if self.flags.in_flight.load(Ordering::Acquire) {
            self.metrics.dropped_busy.fetch_add(1, Ordering::Relaxed);
            return DispatchOutcome::DroppedBusy;
        }
        if self.last_dispatched_ms == Some(frame.timestamp_ms) {
            self.metrics.dropped_duplicate.fetch_add(1, Ordering::Relaxed);
            return DispatchOutcome::DroppedDuplicate;
        }

        let timestamp_ms = frame.timestamp_ms;
        self.flags.in_flight.store(true, Ordering::Release);
        match tx.try_send(frame) {
            Ok(()) => {
                self.last_dispatched_ms = Some(timestamp_ms);
                self.metrics.dispatched.fetch_add(1, Ordering::Relaxed);
                DispatchOutcome::Dispatched
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.dropped_busy.fetch_add(1, Ordering::Relaxed);
                DispatchOutcome::DroppedBusy
            }
            Err(TrySendError::Disconnected(_)) => {
                self.flags.in_flight.store(false, Ordering::Release);
                if self.flags.unavailable.load(Ordering::Acquire) {
                    DispatchOutcome::Unavailable
                } else {
                    warn!("Inference worker stopped unexpectedly");
                    DispatchOutcome::ShutDown
                }
            }
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.flags.ready.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.flags.unavailable.load(Ordering::Acquire)
    }

    /// Whether a request is outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.flags.in_flight.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn handle(&self) -> TrackingHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Block until the source is ready or has failed, up to `timeout`.
    /// Returns whether the source is ready.
    pub fn wait_until_ready(&self, timeout: Duration) -> bool {
        self.wait_for(timeout, |s| s.is_ready() || s.is_unavailable());
        self.is_ready()
    }

    /// Block until no request is outstanding, up to `timeout`.
    /// Returns whether the worker is idle.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        self.wait_for(timeout, |s| !s.is_busy())
    }

    /// Block on worker events until `done` holds or `timeout` passes
    fn wait_for(&self, timeout: Duration, done: impl Fn(&Self) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if done(self) {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.events.recv_timeout(remaining) {
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return done(self),
            }
        }
    }

    /// Tear down the worker.
    ///
    /// Outstanding requests are abandoned without touching the session. A
    /// worker stuck inside the detector past the grace period is detached
    /// rather than joined, so teardown always returns.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.flags.cancelled.store(true, Ordering::Release);
        self.request_tx = None;

        // The event channel disconnects when the worker returns
        let deadline = Instant::now() + self.shutdown_grace;
        let exited = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(_) => {}
                Err(RecvTimeoutError::Disconnected) => break true,
                Err(RecvTimeoutError::Timeout) => break false,
            }
        };

        if exited {
            if worker.join().is_err() {
                warn!("Inference worker panicked");
            }
            info!("Inference worker stopped");
        } else {
            warn!(
                "Inference worker still busy after {:?}, detaching it",
                self.shutdown_grace
            );
        }
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
