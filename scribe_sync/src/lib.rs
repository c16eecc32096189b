//! # Scribe Sync Engine
//!
//! Drives a controller-managed planar axis pair along queued trajectory
//! points, one handshake cycle at a time, while keeping a live status
//! record consistent for display layers.
//!
//! ## Architecture
//!
//! - [`queue::PointQueue`] — strict-FIFO hand-off from the producer side
//!   to the sync worker.
//! - [`handshake::HandshakeEngine`] — the per-point idle → stage → done
//!   wire protocol against the controller's data-block image.
//! - [`status_cell::StatusCell`] — the single shared mutable record;
//!   snapshot reads, closure-scoped whole-transition writes.
//! - [`client::SyncClient`] — owns the worker thread and exposes the
//!   control surface (pause/resume/reset/stop/enqueue/hot-swap).
//!
//! ## Concurrency model
//!
//! Two-party: one dedicated worker thread performs all blocking, polling
//! I/O against the controller; everything else (control surface, display)
//! runs on the caller's thread. Every suspension point is bounded by an
//! explicit timeout, and a single stop flag is observed at every polling
//! iteration. Fatal failures never cross the thread boundary as errors —
//! they land in the status record, and the caller polls for them.

use std::sync::Arc;

use parking_lot::Mutex;
use scribe_link::ControllerLink;

pub mod client;
pub mod error;
pub mod handshake;
pub mod queue;
pub mod status_cell;
mod worker;

pub use client::{SyncClient, SyncTuning};
pub use error::SyncError;

/// The controller link, shared between the worker and the control surface.
///
/// Each read-modify-write transaction against the wire region holds this
/// lock for its whole duration, so the enable-bit flips of the control
/// surface can never interleave with an in-flight point staging.
pub type SharedLink = Arc<Mutex<Box<dyn ControllerLink>>>;
