//! Live run status shared between the sync worker and display layers.
//!
//! `LiveStatus` is a plain value: the sync crate owns the cell that holds
//! it and hands out snapshots. Display layers poll snapshots at their own
//! frame rate and never mutate anything.

use std::fmt;

use crate::geom::Point2D;

// ─── Run state ──────────────────────────────────────────────────────

/// Lifecycle state of a drawing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// No session yet.
    #[default]
    Idle,
    /// Link establishment in progress.
    Connecting,
    /// Connected, no motion pending.
    Ready,
    /// A point is being executed by the controller.
    Moving,
    /// External control suspended — controller holds position.
    Paused,
    /// A fatal handshake failure halted the worker; reset required.
    Error,
    /// The queue drained with no error.
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Moving => "moving",
            Self::Paused => "paused",
            Self::Error => "error",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

// ─── Live status record ─────────────────────────────────────────────

/// Snapshot of the run as the display layer sees it.
///
/// Written by the sync worker while running and by the control surface
/// during pause/resume/reset; each transition lands as one visible unit.
#[derive(Debug, Clone, Default)]
pub struct LiveStatus {
    /// Last position the controller confirmed reaching [mm].
    pub current_position: Point2D,
    /// Target of the point currently in flight [mm].
    pub target_position: Point2D,
    /// Run lifecycle state.
    pub state: RunState,
    /// Emission index of the point in flight (or last completed).
    pub point_index: u32,
    /// Size of the most recently enqueued trajectory.
    pub total_points: usize,
    /// Feed velocity of the point in flight [mm/s].
    pub velocity: f64,
    /// Human-readable description of the last fatal failure.
    pub error_message: Option<String>,
    /// Controller feedback: motion in progress.
    pub controller_busy: bool,
    /// Controller feedback: last point completed.
    pub controller_done: bool,
    /// Controller feedback: fault bit raised.
    pub controller_fault: bool,
}

impl LiveStatus {
    /// Completed fraction of the current trajectory, 0–100.
    pub fn progress_percent(&self) -> f64 {
        if self.total_points == 0 {
            return 0.0;
        }
        (self.point_index as f64 / self.total_points as f64) * 100.0
    }
}

impl fmt::Display for LiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pos={} state={} progress={:.1}%",
            self.current_position,
            self.state,
            self.progress_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_handles_empty_trajectory() {
        let status = LiveStatus::default();
        assert_eq!(status.progress_percent(), 0.0);
    }

    #[test]
    fn progress_tracks_point_index() {
        let status = LiveStatus {
            point_index: 30,
            total_points: 300,
            ..LiveStatus::default()
        };
        assert!((status.progress_percent() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(LiveStatus::default().state, RunState::Idle);
    }
}
