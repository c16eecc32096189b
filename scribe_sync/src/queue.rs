//! Pending trajectory points, strict FIFO.
//!
//! Single producer (the control surface), single consumer (the sync
//! worker). Points reach the controller in exactly the order they were
//! enqueued — no reordering, no coalescing.
//!
//! `clear` bumps an epoch counter. The worker records the epoch at pop
//! time and revalidates it right before staging, so a point popped before
//! a drain (reset or hot-swap) is discarded instead of written stale.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use scribe_common::geom::TrajectoryPoint;

struct QueueInner {
    points: VecDeque<TrajectoryPoint>,
    epoch: u64,
}

/// A point handed to the worker, tagged with the queue epoch it came from.
#[derive(Debug, Clone, Copy)]
pub struct Popped {
    pub point: TrajectoryPoint,
    pub epoch: u64,
}

/// FIFO of pending trajectory points.
pub struct PointQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
}

impl PointQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                points: VecDeque::new(),
                epoch: 0,
            }),
            available: Condvar::new(),
        }
    }

    /// Append one point.
    pub fn push(&self, point: TrajectoryPoint) {
        let mut inner = self.inner.lock();
        inner.points.push_back(point);
        self.available.notify_one();
    }

    /// Append a whole trajectory, preserving its order.
    pub fn extend(&self, points: impl IntoIterator<Item = TrajectoryPoint>) {
        let mut inner = self.inner.lock();
        inner.points.extend(points);
        self.available.notify_one();
    }

    /// Pop the oldest point, blocking up to `wait` when empty.
    ///
    /// `None` after the wait is not an error — the queue simply drained
    /// faster than new work arrived.
    pub fn pop_wait(&self, wait: Duration) -> Option<Popped> {
        let mut inner = self.inner.lock();
        if inner.points.is_empty() {
            let _ = self.available.wait_for(&mut inner, wait);
        }
        let epoch = inner.epoch;
        inner.points.pop_front().map(|point| Popped { point, epoch })
    }

    /// Discard all pending points atomically and invalidate any point
    /// already popped but not yet staged. Returns the number discarded.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let discarded = inner.points.len();
        inner.points.clear();
        inner.epoch += 1;
        discarded
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().points.len()
    }

    /// Current drain epoch.
    pub fn epoch(&self) -> u64 {
        self.inner.lock().epoch
    }
}

impl Default for PointQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_common::geom::Point2D;
    use std::time::Instant;

    fn point(index: u32) -> TrajectoryPoint {
        TrajectoryPoint::new(Point2D::new(index as f64, 0.0), 5.0, index)
    }

    #[test]
    fn pops_in_enqueue_order() {
        let queue = PointQueue::new();
        queue.extend((0..5).map(point));
        for expected in 0..5 {
            let popped = queue.pop_wait(Duration::from_millis(10)).unwrap();
            assert_eq!(popped.point.index, expected);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_pop_times_out_with_none() {
        let queue = PointQueue::new();
        let start = Instant::now();
        assert!(queue.pop_wait(Duration::from_millis(50)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn clear_discards_everything_and_bumps_epoch() {
        let queue = PointQueue::new();
        queue.extend((0..3).map(point));
        let before = queue.epoch();

        assert_eq!(queue.clear(), 3);
        assert!(queue.is_empty());
        assert_eq!(queue.epoch(), before + 1);
    }

    #[test]
    fn popped_epoch_detects_a_drain() {
        let queue = PointQueue::new();
        queue.push(point(0));
        let popped = queue.pop_wait(Duration::from_millis(10)).unwrap();
        assert_eq!(popped.epoch, queue.epoch());

        queue.clear();
        assert_ne!(popped.epoch, queue.epoch());
    }

    #[test]
    fn push_wakes_a_waiting_consumer() {
        let queue = std::sync::Arc::new(PointQueue::new());
        let producer = {
            let queue = std::sync::Arc::clone(&queue);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                queue.push(point(9));
            })
        };
        let popped = queue.pop_wait(Duration::from_millis(500)).unwrap();
        assert_eq!(popped.point.index, 9);
        producer.join().unwrap();
    }
}
