//! Controller transports for the scribe workspace.
//!
//! The sync engine talks to the axis controller exclusively through the
//! [`ControllerLink`] capability trait, so transports are pluggable:
//!
//! - [`mapped::MappedLink`] — the production transport, attached to the
//!   data-block image the fieldbus gateway exports as a memory-mapped
//!   region.
//! - [`sim::SimLink`] — an in-process simulated controller for tests and
//!   sim mode, scriptable per point.
//!
//! All region offsets are relative to the data-block base and bounded by
//! [`scribe_common::wire::REGION_LEN`].

use thiserror::Error;

pub mod mapped;
pub mod sim;

pub use mapped::MappedLink;
pub use sim::{SimHandle, SimLink};

// ─── Error type ─────────────────────────────────────────────────────

/// Errors raised by controller transports.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Operation attempted before `connect` succeeded.
    #[error("not connected to the controller")]
    NotConnected,

    /// The wire channel could not be established.
    #[error("controller unreachable: {reason}")]
    Unreachable {
        /// What failed while connecting.
        reason: String,
    },

    /// The exported region is smaller than the handshake image.
    #[error("exported region too small: {actual} bytes, need {required}")]
    RegionTooSmall {
        /// Size found.
        actual: usize,
        /// Size required.
        required: usize,
    },

    /// A region access fell outside the handshake image.
    #[error("region access out of bounds: offset {offset} len {len} exceeds {region} bytes")]
    OutOfBounds {
        /// Offset requested.
        offset: usize,
        /// Length requested.
        len: usize,
        /// Region size.
        region: usize,
    },

    /// Underlying I/O failure.
    #[error("region I/O failed: {source}")]
    Io {
        /// Source I/O error.
        #[from]
        source: std::io::Error,
    },
}

// ─── Capability trait ───────────────────────────────────────────────

/// A channel to the controller's handshake data block.
///
/// # Lifecycle
///
/// 1. `connect()` — establish the wire channel once, before the worker
///    starts. Failure is surfaced to the caller; there is no automatic
///    retry (the caller decides the fallback).
/// 2. `read_region()` / `write_region()` — byte-level access, called from
///    the sync worker's polling loops and the control surface.
/// 3. `disconnect()` — release the channel. Idempotent.
///
/// Implementations serialize nothing themselves beyond single-call
/// consistency; the sync engine wraps the link in a mutex and holds it for
/// the whole of every read-modify-write transaction, so the controller
/// never observes a half-updated point.
pub trait ControllerLink: Send {
    /// Establish the wire channel.
    fn connect(&mut self) -> Result<(), LinkError>;

    /// Release the wire channel. Safe to call when not connected.
    fn disconnect(&mut self);

    /// Whether `connect` has succeeded and the channel is live.
    fn is_connected(&self) -> bool;

    /// Read `buf.len()` bytes starting at `offset` into `buf`.
    fn read_region(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), LinkError>;

    /// Write `data` starting at `offset`, visible to the controller as
    /// one store.
    fn write_region(&mut self, offset: usize, data: &[u8]) -> Result<(), LinkError>;

    /// Human-readable endpoint description for logs.
    fn describe(&self) -> String;
}

/// Shared bounds check for region accesses.
pub(crate) fn check_bounds(offset: usize, len: usize, region: usize) -> Result<(), LinkError> {
    if offset + len > region {
        return Err(LinkError::OutOfBounds {
            offset,
            len,
            region,
        });
    }
    Ok(())
}
