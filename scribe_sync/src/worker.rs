//! The dedicated sync worker loop.
//!
//! Pops one point at a time, runs the handshake cycle for it, and keeps
//! the status record current. The first fatal failure terminates the
//! loop: no further points are dispatched until the caller resets and
//! restarts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use scribe_common::consts::DISABLED_RETRY_WAIT_MS;
use scribe_common::geom::TrajectoryPoint;
use scribe_common::status::RunState;

use crate::error::SyncError;
use crate::handshake::{HandshakeEngine, IdleWait};
use crate::queue::PointQueue;
use crate::status_cell::StatusCell;

enum PointOutcome {
    /// The controller confirmed the point.
    Completed,
    /// The queue was drained after this point was popped; never staged.
    Superseded,
}

pub(crate) struct Worker {
    pub engine: HandshakeEngine,
    pub queue: Arc<PointQueue>,
    pub status: Arc<StatusCell>,
    pub stop: Arc<AtomicBool>,
    pub pop_wait: Duration,
}

impl Worker {
    pub fn run(self) {
        info!("sync worker started");

        while !self.stop.load(Ordering::Relaxed) {
            let Some(popped) = self.queue.pop_wait(self.pop_wait) else {
                // The queue drained faster than new work arrived — not an
                // error, just nothing to move towards right now.
                self.status.update(|s| {
                    if s.state == RunState::Moving {
                        s.state = RunState::Ready;
                    }
                });
                continue;
            };

            let point = popped.point;
            self.status.update(|s| {
                s.target_position = point.position;
                s.point_index = point.index;
                s.velocity = point.velocity;
                s.state = RunState::Moving;
            });

            match self.process(&point, popped.epoch) {
                Ok(PointOutcome::Completed) => {
                    if self.queue.epoch() != popped.epoch {
                        // A reset landed while the point was in flight; its
                        // completion must not resurrect pre-reset bookkeeping.
                        debug!(
                            "point {} completed after a drain, bookkeeping unchanged",
                            point.index
                        );
                        continue;
                    }
                    let drained = self.queue.is_empty();
                    self.status.update(|s| {
                        s.current_position = point.position;
                        if drained {
                            s.state = RunState::Done;
                        }
                    });
                }
                Ok(PointOutcome::Superseded) => {
                    debug!("point {} discarded, queue drained after pop", point.index);
                }
                Err(SyncError::Stopped) => break,
                Err(e) => {
                    // Fatal. Surfaced through the status record only.
                    error!("point {} failed: {e}", point.index);
                    self.status.update(|s| {
                        s.state = RunState::Error;
                        s.error_message = Some(e.to_string());
                    });
                    break;
                }
            }
        }

        if self.queue.is_empty() && self.status.state() != RunState::Error {
            self.status.update(|s| s.state = RunState::Done);
            info!("all trajectory points complete");
        }
        info!("sync worker stopped");
    }

    /// Run the handshake cycle for one point.
    fn process(&self, point: &TrajectoryPoint, epoch: u64) -> Result<PointOutcome, SyncError> {
        loop {
            match self.engine.wait_idle()? {
                IdleWait::Ready => break,
                IdleWait::TimedOut => {
                    // Idle deadline exhausted: stage anyway. The dropped-point
                    // risk is logged, not fatal.
                    warn!(
                        "staging point {} without idle confirmation, it may be dropped",
                        point.index
                    );
                    break;
                }
                IdleWait::Disabled => {
                    // Controller holds external control revoked (pause).
                    // Keep the point and ask again; stop requests are
                    // observed inside wait_idle.
                    std::thread::sleep(Duration::from_millis(DISABLED_RETRY_WAIT_MS));
                }
            }
        }

        // A drain (reset or hot-swap) after the pop invalidates the point.
        if self.queue.epoch() != epoch {
            return Ok(PointOutcome::Superseded);
        }

        self.engine.write_point(point)?;
        self.engine.wait_for_done()?;
        Ok(PointOutcome::Completed)
    }
}
