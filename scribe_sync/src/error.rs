//! Error types for the sync engine.

use thiserror::Error;

use scribe_link::LinkError;

/// Errors raised by the sync engine and its control surface.
///
/// Inside the worker loop these stay local until fatal, at which point
/// they surface through the status record only. Control-surface methods
/// return them directly; expected refusals (not connected) are ordinary
/// values here, not panics.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Controller transport failure.
    #[error("controller link: {0}")]
    Link(#[from] LinkError),

    /// Operation requires an established connection.
    #[error("not connected to the controller")]
    NotConnected,

    /// The controller raised its fault bit during motion. Fatal, never
    /// retried.
    #[error("controller reported a fault during motion")]
    ControllerFault,

    /// The controller did not finish a point within the configured bound.
    #[error("motion did not complete within {seconds:.1}s")]
    DoneTimeout {
        /// The exhausted bound.
        seconds: f64,
    },

    /// A stop request interrupted the operation. Clean shutdown, not a
    /// failure.
    #[error("stopped by request")]
    Stopped,

    /// The worker did not exit within the join bound after a stop request.
    #[error("sync worker did not exit within {seconds:.1}s")]
    JoinTimeout {
        /// The exhausted bound.
        seconds: f64,
    },

    /// Worker thread could not be spawned.
    #[error("failed to start sync worker: {source}")]
    Spawn {
        /// Source I/O error.
        #[from]
        source: std::io::Error,
    },
}
