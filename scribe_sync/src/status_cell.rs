//! The shared live-status record.
//!
//! One cell holds the whole [`LiveStatus`]; readers take snapshots,
//! writers apply closure-scoped transitions under the write lock so a
//! multi-field update always lands as one visible unit. No field setters
//! cross the thread boundary.
//!
//! Writer discipline: the sync worker owns routine transitions while
//! running; the control surface owns pause/resume/reset transitions.
//! Because every transition is atomic at this granularity, the two
//! writers never expose a half-applied state to readers.

use parking_lot::RwLock;

use scribe_common::status::{LiveStatus, RunState};

/// Shared holder of the run's live status.
pub struct StatusCell {
    inner: RwLock<LiveStatus>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LiveStatus::default()),
        }
    }

    /// Read a consistent copy of the whole record. Never blocks writers
    /// beyond the copy itself.
    pub fn snapshot(&self) -> LiveStatus {
        self.inner.read().clone()
    }

    /// Current lifecycle state only.
    pub fn state(&self) -> RunState {
        self.inner.read().state
    }

    /// Apply one whole transition under the write lock.
    pub fn update<F>(&self, transition: F)
    where
        F: FnOnce(&mut LiveStatus),
    {
        let mut status = self.inner.write();
        transition(&mut status);
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_common::geom::Point2D;

    #[test]
    fn snapshots_are_detached_copies() {
        let cell = StatusCell::new();
        let before = cell.snapshot();
        cell.update(|s| s.state = RunState::Moving);
        assert_eq!(before.state, RunState::Idle);
        assert_eq!(cell.state(), RunState::Moving);
    }

    #[test]
    fn transition_lands_as_one_unit() {
        let cell = StatusCell::new();
        cell.update(|s| {
            s.state = RunState::Moving;
            s.target_position = Point2D::new(20.0, 10.0);
            s.point_index = 1;
            s.velocity = 5.0;
        });

        let snap = cell.snapshot();
        assert_eq!(snap.state, RunState::Moving);
        assert_eq!(snap.target_position, Point2D::new(20.0, 10.0));
        assert_eq!(snap.point_index, 1);
        assert_eq!(snap.velocity, 5.0);
    }
}
