//! Session client: connection lifecycle, worker thread, control surface.
//!
//! `SyncClient` is the single entry point for callers. It owns the shared
//! link, the point queue, the status cell, and the worker thread, and it
//! exposes the pause/resume/reset/stop surface. All methods return a
//! success/failure value; expected refusals (not connected) are ordinary
//! `Err` values, and fatal worker conditions are discovered by polling
//! [`SyncClient::status`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use scribe_common::config::LinkConfig;
use scribe_common::consts::{
    DEFAULT_DONE_TIMEOUT_S, DEFAULT_POLL_INTERVAL_MS, IDLE_TIMEOUT_S,
    QUEUE_POP_WAIT_S, WORKER_JOIN_TIMEOUT_S,
};
use scribe_common::geom::{Point2D, TrajectoryPoint};
use scribe_common::status::{LiveStatus, RunState};
use scribe_common::wire::{HandshakeFlags, OFF_FLAGS};
use scribe_link::ControllerLink;

use crate::SharedLink;
use crate::error::SyncError;
use crate::handshake::HandshakeEngine;
use crate::queue::PointQueue;
use crate::status_cell::StatusCell;
use crate::worker::Worker;

// ─── Tuning ─────────────────────────────────────────────────────────

/// Timing bounds of the engine's suspension points.
///
/// All three waits — idle-wait, done-wait, queue-pop — are bounded;
/// nothing in the engine blocks indefinitely.
#[derive(Debug, Clone, Copy)]
pub struct SyncTuning {
    /// Bound for the controller to report idle before staging.
    pub idle_timeout: Duration,
    /// Bound for a staged point's motion to complete.
    pub done_timeout: Duration,
    /// Controller status poll interval.
    pub poll_interval: Duration,
    /// Single queue-pop wait.
    pub pop_wait: Duration,
    /// Bound for the worker to exit after a stop request.
    pub join_timeout: Duration,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs_f64(IDLE_TIMEOUT_S),
            done_timeout: Duration::from_secs_f64(DEFAULT_DONE_TIMEOUT_S),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            pop_wait: Duration::from_secs_f64(QUEUE_POP_WAIT_S),
            join_timeout: Duration::from_secs_f64(WORKER_JOIN_TIMEOUT_S),
        }
    }
}

impl SyncTuning {
    /// Tuning with the configurable bounds taken from the link config.
    pub fn from_link(config: &LinkConfig) -> Self {
        Self {
            done_timeout: config.done_timeout(),
            poll_interval: config.poll_interval(),
            ..Self::default()
        }
    }
}

// ─── Client ─────────────────────────────────────────────────────────

/// Owner of the sync session: link, queue, status, and worker thread.
pub struct SyncClient {
    link: SharedLink,
    status: Arc<StatusCell>,
    queue: Arc<PointQueue>,
    tuning: SyncTuning,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SyncClient {
    /// Build a session over any controller transport.
    pub fn new(link: Box<dyn ControllerLink>, tuning: SyncTuning) -> Self {
        Self {
            link: Arc::new(Mutex::new(link)),
            status: Arc::new(StatusCell::new()),
            queue: Arc::new(PointQueue::new()),
            tuning,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    // ─── Connection lifecycle ───────────────────────────────────────

    /// Establish the wire channel. Failure is surfaced to the caller and
    /// mirrored into the status record; there is no automatic retry.
    pub fn connect(&mut self) -> Result<(), SyncError> {
        self.status.update(|s| s.state = RunState::Connecting);
        let mut link = self.link.lock();
        info!("connecting to {}", link.describe());
        match link.connect() {
            Ok(()) => {
                drop(link);
                self.status.update(|s| s.state = RunState::Ready);
                info!("connected");
                Ok(())
            }
            Err(e) => {
                drop(link);
                self.status.update(|s| {
                    s.state = RunState::Error;
                    s.error_message = Some(e.to_string());
                });
                Err(e.into())
            }
        }
    }

    /// Release the wire channel, handing control back first (best effort).
    pub fn disconnect(&mut self) {
        let mut link = self.link.lock();
        if !link.is_connected() {
            return;
        }
        let mut byte = [0u8];
        if link.read_region(OFF_FLAGS, &mut byte).is_ok() {
            let mut flags = HandshakeFlags::from_bits_truncate(byte[0]);
            flags.remove(HandshakeFlags::ENABLE);
            if let Err(e) = link.write_region(OFF_FLAGS, &[flags.bits()]) {
                warn!("could not clear enable on disconnect: {e}");
            }
        }
        link.disconnect();
        info!("disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.link.lock().is_connected()
    }

    // ─── Worker lifecycle ───────────────────────────────────────────

    /// Spawn the sync worker. A no-op while one is already alive; may be
    /// called again after a stop or a fatal error.
    pub fn start(&mut self) -> Result<(), SyncError> {
        if self.worker.as_ref().is_some_and(|h| !h.is_finished()) {
            warn!("sync worker already running");
            return Ok(());
        }
        if let Some(finished) = self.worker.take() {
            let _ = finished.join();
        }

        self.stop.store(false, Ordering::Relaxed);
        let worker = Worker {
            engine: HandshakeEngine::new(
                Arc::clone(&self.link),
                Arc::clone(&self.status),
                Arc::clone(&self.stop),
                self.tuning,
            ),
            queue: Arc::clone(&self.queue),
            status: Arc::clone(&self.status),
            stop: Arc::clone(&self.stop),
            pop_wait: self.tuning.pop_wait,
        };
        let handle = thread::Builder::new()
            .name("scribe-sync".to_string())
            .spawn(move || worker.run())?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Signal the worker to exit at its next checkpoint and join it,
    /// bounded by the join timeout. Never touches the wire region.
    pub fn stop(&mut self) -> Result<(), SyncError> {
        let Some(handle) = self.worker.take() else {
            return Ok(());
        };
        debug!("stopping sync worker");
        self.stop.store(true, Ordering::Relaxed);

        let deadline = Instant::now() + self.tuning.join_timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if !handle.is_finished() {
            return Err(SyncError::JoinTimeout {
                seconds: self.tuning.join_timeout.as_secs_f64(),
            });
        }
        let _ = handle.join();
        Ok(())
    }

    /// Whether the worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    // ─── Work intake ────────────────────────────────────────────────

    /// Append a trajectory to the queue and record its size. The only way
    /// new work enters the system. Returns the number of points taken.
    pub fn enqueue_trajectory(&self, points: Vec<TrajectoryPoint>) -> usize {
        let count = points.len();
        self.status.update(|s| s.total_points = count);
        self.queue.extend(points);
        info!("enqueued {count} trajectory points");
        count
    }

    /// Replace the active trajectory while running: pause, drain, enqueue,
    /// resume. The queue epoch guarantees the worker never stages a point
    /// popped before the drain.
    pub fn swap_trajectory(&self, points: Vec<TrajectoryPoint>) -> Result<(), SyncError> {
        self.pause()?;
        let discarded = self.queue.clear();
        debug!("hot-swap discarded {discarded} pending points");
        self.enqueue_trajectory(points);
        self.resume()
    }

    // ─── Control surface ────────────────────────────────────────────

    /// Revoke external control: the controller stops accepting points and
    /// holds position. Refused when not connected.
    pub fn pause(&self) -> Result<(), SyncError> {
        self.set_enable_bit(false)?;
        self.status.update(|s| s.state = RunState::Paused);
        info!("paused, enable cleared");
        Ok(())
    }

    /// Grant external control again after a pause.
    pub fn resume(&self) -> Result<(), SyncError> {
        self.set_enable_bit(true)?;
        self.status.update(|s| s.state = RunState::Ready);
        info!("resumed, enable set");
        Ok(())
    }

    /// Pause, drain the queue, and return the session to a clean posture:
    /// origin position, index zero, feedback flags and error cleared.
    pub fn reset(&self) -> Result<(), SyncError> {
        if let Err(e) = self.pause() {
            debug!("pause skipped during reset: {e}");
        }
        let discarded = self.queue.clear();
        if discarded > 0 {
            debug!("reset discarded {discarded} pending points");
        }
        self.status.update(|s| {
            s.current_position = Point2D::ORIGIN;
            s.point_index = 0;
            s.controller_busy = false;
            s.controller_done = false;
            s.controller_fault = false;
            s.error_message = None;
            s.state = RunState::Ready;
        });
        info!("reset complete");
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.status.state() == RunState::Paused
    }

    /// Flip the wire Enable bit as one read-modify-write transaction.
    fn set_enable_bit(&self, enable: bool) -> Result<(), SyncError> {
        let mut link = self.link.lock();
        if !link.is_connected() {
            warn!("not connected, refusing enable change");
            return Err(SyncError::NotConnected);
        }
        let mut byte = [0u8];
        link.read_region(OFF_FLAGS, &mut byte)?;
        let mut flags = HandshakeFlags::from_bits_truncate(byte[0]);
        flags.set(HandshakeFlags::ENABLE, enable);
        link.write_region(OFF_FLAGS, &[flags.bits()])?;
        Ok(())
    }

    // ─── Display access ─────────────────────────────────────────────

    /// Read-only snapshot for display layers, safe from any thread.
    pub fn status(&self) -> LiveStatus {
        self.status.snapshot()
    }

    /// Shared handle to the status cell for a polling display loop.
    pub fn status_cell(&self) -> Arc<StatusCell> {
        Arc::clone(&self.status)
    }

    /// Number of points still waiting in the queue.
    pub fn pending_points(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        // No join here: stop() is the bounded shutdown path. A worker
        // still alive at drop observes the flag at its next checkpoint.
        self.stop.store(true, Ordering::Relaxed);
    }
}
