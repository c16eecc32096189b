//! The per-point wire handshake: idle-wait → stage → done-wait.
//!
//! Guarantees at most one point in flight: a new point is staged only
//! once the previous one has both finished motion (`DONE`) and been
//! consumed by the controller (`NEW_POINT` clear). Waiting is poll-based
//! with bounded intervals and explicit deadlines — the protocol is itself
//! poll-based on the controller side, and nothing here may hang
//! indefinitely.
//!
//! When the idle-wait deadline expires, the caller stages the next point
//! anyway and only logs the dropped-point risk. The refusal case is
//! different: with `ENABLE` low the engine reports
//! [`IdleWait::Disabled`] at once and writes nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use scribe_common::consts::LINK_RETRY_BACKOFF_MS;
use scribe_common::geom::TrajectoryPoint;
use scribe_common::wire::{self, HandshakeFlags, OFF_FLAGS, REGION_LEN};

use crate::SharedLink;
use crate::client::SyncTuning;
use crate::error::SyncError;
use crate::status_cell::StatusCell;

/// Outcome of an idle-wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleWait {
    /// The controller is idle; the next point may be staged.
    Ready,
    /// The deadline expired without the idle condition. The caller
    /// proceeds anyway, accepting the dropped-point risk.
    TimedOut,
    /// External control is not granted (`ENABLE` low). A refusal, not an
    /// error — the caller holds the point and asks again.
    Disabled,
}

/// Executes the wire protocol for one point at a time.
pub struct HandshakeEngine {
    link: SharedLink,
    status: Arc<StatusCell>,
    stop: Arc<AtomicBool>,
    tuning: SyncTuning,
    retry_backoff: Duration,
}

impl HandshakeEngine {
    pub fn new(
        link: SharedLink,
        status: Arc<StatusCell>,
        stop: Arc<AtomicBool>,
        tuning: SyncTuning,
    ) -> Self {
        Self {
            link,
            status,
            stop,
            tuning,
            retry_backoff: Duration::from_millis(LINK_RETRY_BACKOFF_MS),
        }
    }

    fn read_flags(&self) -> Result<HandshakeFlags, SyncError> {
        let mut byte = [0u8];
        self.link.lock().read_region(OFF_FLAGS, &mut byte)?;
        Ok(HandshakeFlags::from_bits_truncate(byte[0]))
    }

    /// Poll until the controller certifies the previous point is both
    /// finished and consumed: `ENABLE && DONE && !BUSY && !NEW_POINT`.
    ///
    /// This is the only condition under which staging a new point is
    /// safe. Transient read failures are retried until the deadline.
    pub fn wait_idle(&self) -> Result<IdleWait, SyncError> {
        let deadline = Instant::now() + self.tuning.idle_timeout;
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Err(SyncError::Stopped);
            }
            if Instant::now() >= deadline {
                warn!(
                    "controller not idle within {:.1}s",
                    self.tuning.idle_timeout.as_secs_f64()
                );
                return Ok(IdleWait::TimedOut);
            }
            match self.read_flags() {
                Ok(flags) => {
                    if !flags.contains(HandshakeFlags::ENABLE) {
                        debug!("external control not granted, holding new points");
                        return Ok(IdleWait::Disabled);
                    }
                    if flags.is_idle() {
                        return Ok(IdleWait::Ready);
                    }
                    std::thread::sleep(self.tuning.poll_interval);
                }
                Err(e) => {
                    warn!("status read failed, retrying: {e}");
                    std::thread::sleep(self.retry_backoff);
                }
            }
        }
    }

    /// Stage one point as a single wire transaction.
    ///
    /// Reads the whole region image, sets the target fields, clears the
    /// stale `DONE`, raises `ENABLE` + `NEW_POINT`, and writes the image
    /// back — all under one link lock hold, so the controller never sees
    /// a half-updated point.
    pub fn write_point(&self, point: &TrajectoryPoint) -> Result<(), SyncError> {
        let mut link = self.link.lock();
        let mut image = [0u8; REGION_LEN];
        link.read_region(0, &mut image)?;
        wire::stage_point(&mut image, point);
        link.write_region(0, &image)?;
        debug!("staged {point}");
        Ok(())
    }

    /// Poll until the controller reports the staged point complete
    /// (`DONE && !BUSY`), mirroring busy/done/fault into the status
    /// record on every poll so the display sees live feedback.
    ///
    /// A raised fault bit fails immediately and is never retried; an
    /// expired deadline is equally fatal.
    pub fn wait_for_done(&self) -> Result<(), SyncError> {
        let deadline = Instant::now() + self.tuning.done_timeout;
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Err(SyncError::Stopped);
            }
            if Instant::now() >= deadline {
                return Err(SyncError::DoneTimeout {
                    seconds: self.tuning.done_timeout.as_secs_f64(),
                });
            }
            match self.read_flags() {
                Ok(flags) => {
                    let busy = flags.contains(HandshakeFlags::BUSY);
                    let done = flags.contains(HandshakeFlags::DONE);
                    let fault = flags.contains(HandshakeFlags::FAULT);
                    self.status.update(|s| {
                        s.controller_busy = busy;
                        s.controller_done = done;
                        s.controller_fault = fault;
                    });
                    if fault {
                        error!("controller raised its fault bit");
                        return Err(SyncError::ControllerFault);
                    }
                    if done && !busy {
                        debug!("point complete");
                        return Ok(());
                    }
                    std::thread::sleep(self.tuning.poll_interval);
                }
                Err(e) => {
                    warn!("status read failed, retrying: {e}");
                    std::thread::sleep(self.retry_backoff);
                }
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
