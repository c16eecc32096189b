//! System-wide constants for the scribe workspace.
//!
//! Single source of truth for workspace bounds, default timings, and
//! connection defaults. Imported by all crates — no duplication permitted.

/// Minimum reachable X coordinate [mm].
pub const WORKSPACE_X_MIN: f64 = 0.0;

/// Maximum reachable X coordinate [mm].
pub const WORKSPACE_X_MAX: f64 = 1000.0;

/// Minimum reachable Y coordinate [mm].
pub const WORKSPACE_Y_MIN: f64 = -50.0;

/// Maximum reachable Y coordinate [mm].
pub const WORKSPACE_Y_MAX: f64 = 370.0;

/// Default feed velocity [mm/s].
pub const DEFAULT_VELOCITY: f64 = 50.0;

/// Default controller address.
pub const DEFAULT_ADDRESS: &str = "192.168.0.1";

/// Default data-block identifier holding the handshake image.
pub const DEFAULT_DATA_BLOCK: u16 = 200;

/// Default poll interval for controller status [ms].
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Default bound for a single point's motion to complete [s].
pub const DEFAULT_DONE_TIMEOUT_S: f64 = 30.0;

/// Bound for the controller to report idle before a new point is staged [s].
pub const IDLE_TIMEOUT_S: f64 = 5.0;

/// How long a single queue pop blocks before re-checking for work [s].
pub const QUEUE_POP_WAIT_S: f64 = 1.0;

/// Bound for the sync worker to exit after a stop request [s].
pub const WORKER_JOIN_TIMEOUT_S: f64 = 5.0;

/// Back-off after a transient link failure inside a wait loop [ms].
pub const LINK_RETRY_BACKOFF_MS: u64 = 100;

/// Wait between idle re-checks while the controller refuses new points [ms].
pub const DISABLED_RETRY_WAIT_MS: u64 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(WORKSPACE_X_MIN < WORKSPACE_X_MAX);
        assert!(WORKSPACE_Y_MIN < WORKSPACE_Y_MAX);
        assert!(DEFAULT_VELOCITY > 0.0);
        assert!(DEFAULT_POLL_INTERVAL_MS > 0);
        assert!(DEFAULT_DONE_TIMEOUT_S > IDLE_TIMEOUT_S);
    }

    #[test]
    fn cancellation_latency_is_bounded_by_poll_interval() {
        // Stop requests are observed at polling granularity, so the poll
        // interval must stay well under every wait bound.
        assert!((DEFAULT_POLL_INTERVAL_MS as f64) / 1000.0 < IDLE_TIMEOUT_S);
        assert!((DEFAULT_POLL_INTERVAL_MS as f64) / 1000.0 < QUEUE_POP_WAIT_S);
    }
}
