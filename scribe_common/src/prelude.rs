//! Common re-exports for convenience.
//!
//! ```rust
//! use scribe_common::prelude::*;
//! ```

pub use crate::config::{LinkConfig, LinkMode, ScribeConfig};
pub use crate::geom::{Point2D, TrajectoryPoint, Workspace};
pub use crate::status::{LiveStatus, RunState};
pub use crate::wire::{HandshakeFlags, REGION_LEN};
