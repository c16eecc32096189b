//! Controller data-block image: layout and codec helpers.
//!
//! The controller exposes one fixed 16-byte block through which all
//! trajectory and handshake data flows. Every logical field maps to a byte
//! offset, booleans to bit positions within the flag byte.
//!
//! ## Layout
//!
//! | Offset | Field       | Type            | Direction              |
//! |--------|-------------|-----------------|------------------------|
//! | 0      | X target    | REAL (4B, BE)   | write                  |
//! | 4      | Y target    | REAL (4B, BE)   | write                  |
//! | 8      | Velocity    | REAL (4B, BE)   | write                  |
//! | 12     | Point index | INT (2B, BE)    | write                  |
//! | 14.0   | NewPoint    | bool            | write, observe clear   |
//! | 14.1   | Busy        | bool            | read-only              |
//! | 14.2   | Done        | bool            | read, cleared on stage |
//! | 14.3   | Fault       | bool            | read-only              |
//! | 14.4   | Enable      | bool            | read/write             |
//!
//! REAL and INT fields use the controller's big-endian representation.

use bitflags::bitflags;
use static_assertions::const_assert;

use crate::geom::TrajectoryPoint;

// ─── Layout constants ───────────────────────────────────────────────

/// Total size of the exchanged data-block image.
pub const REGION_LEN: usize = 16;

/// Byte offset of the X target REAL.
pub const OFF_X: usize = 0;

/// Byte offset of the Y target REAL.
pub const OFF_Y: usize = 4;

/// Byte offset of the velocity REAL.
pub const OFF_VELOCITY: usize = 8;

/// Byte offset of the point-index INT.
pub const OFF_INDEX: usize = 12;

/// Byte offset of the handshake flag byte.
pub const OFF_FLAGS: usize = 14;

// Fields must never overlap the flag byte or run past the region.
const_assert!(OFF_X + 4 <= OFF_Y);
const_assert!(OFF_Y + 4 <= OFF_VELOCITY);
const_assert!(OFF_VELOCITY + 4 <= OFF_INDEX);
const_assert!(OFF_INDEX + 2 <= OFF_FLAGS);
const_assert!(OFF_FLAGS < REGION_LEN);

// ─── Handshake flags ────────────────────────────────────────────────

bitflags! {
    /// Bit assignments within the flag byte at [`OFF_FLAGS`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HandshakeFlags: u8 {
        /// A freshly staged point awaits pickup (set by us, cleared by the
        /// controller on consumption).
        const NEW_POINT = 1 << 0;
        /// The controller is executing a motion.
        const BUSY = 1 << 1;
        /// The last point finished (cleared by us when staging the next).
        const DONE = 1 << 2;
        /// The controller raised a fault.
        const FAULT = 1 << 3;
        /// External control is granted.
        const ENABLE = 1 << 4;
    }
}

impl HandshakeFlags {
    /// The idle condition under which a new point may be staged: control
    /// granted, previous point finished and consumed, no motion running.
    pub fn is_idle(self) -> bool {
        self.contains(Self::ENABLE | Self::DONE)
            && !self.intersects(Self::BUSY | Self::NEW_POINT)
    }
}

// ─── Field accessors ────────────────────────────────────────────────

/// Read a 4-byte big-endian REAL at `offset`.
#[inline]
pub fn get_real(buf: &[u8], offset: usize) -> f64 {
    debug_assert!(offset + 4 <= buf.len());
    let raw = [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]];
    f32::from_be_bytes(raw) as f64
}

/// Write a 4-byte big-endian REAL at `offset`.
#[inline]
pub fn set_real(buf: &mut [u8], offset: usize, value: f64) {
    debug_assert!(offset + 4 <= buf.len());
    buf[offset..offset + 4].copy_from_slice(&(value as f32).to_be_bytes());
}

/// Read a 2-byte big-endian signed INT at `offset`.
#[inline]
pub fn get_int(buf: &[u8], offset: usize) -> i16 {
    debug_assert!(offset + 2 <= buf.len());
    i16::from_be_bytes([buf[offset], buf[offset + 1]])
}

/// Write a 2-byte big-endian signed INT at `offset`.
#[inline]
pub fn set_int(buf: &mut [u8], offset: usize, value: i16) {
    debug_assert!(offset + 2 <= buf.len());
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// Decode the flag byte of a region image.
#[inline]
pub fn flags_of(buf: &[u8]) -> HandshakeFlags {
    HandshakeFlags::from_bits_truncate(buf[OFF_FLAGS])
}

// ─── Point staging ──────────────────────────────────────────────────

/// Stage a trajectory point into a region image read from the controller.
///
/// Sets the X/Y/velocity/index fields, clears `DONE` (a stale `DONE` from
/// the previous cycle must not be misread as completion of this point),
/// then raises `ENABLE` and `NEW_POINT` as the trigger. Bits owned by the
/// controller (`BUSY`, `FAULT`) pass through untouched. The caller writes
/// the whole image back in one transaction.
pub fn stage_point(buf: &mut [u8; REGION_LEN], point: &TrajectoryPoint) {
    set_real(buf, OFF_X, point.position.x);
    set_real(buf, OFF_Y, point.position.y);
    set_real(buf, OFF_VELOCITY, point.velocity);
    set_int(buf, OFF_INDEX, point.index as i16);

    let mut flags = flags_of(buf);
    flags.remove(HandshakeFlags::DONE);
    flags.insert(HandshakeFlags::ENABLE | HandshakeFlags::NEW_POINT);
    buf[OFF_FLAGS] = flags.bits();
}

/// A point as decoded back out of a region image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagedPoint {
    pub x: f64,
    pub y: f64,
    pub velocity: f64,
    pub index: i16,
}

/// Decode the staged point fields of a region image.
pub fn decode_point(buf: &[u8; REGION_LEN]) -> StagedPoint {
    StagedPoint {
        x: get_real(buf, OFF_X),
        y: get_real(buf, OFF_Y),
        velocity: get_real(buf, OFF_VELOCITY),
        index: get_int(buf, OFF_INDEX),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Point2D, TrajectoryPoint};
    use proptest::prelude::*;

    #[test]
    fn flag_bits_match_controller_contract() {
        assert_eq!(HandshakeFlags::NEW_POINT.bits(), 0x01);
        assert_eq!(HandshakeFlags::BUSY.bits(), 0x02);
        assert_eq!(HandshakeFlags::DONE.bits(), 0x04);
        assert_eq!(HandshakeFlags::FAULT.bits(), 0x08);
        assert_eq!(HandshakeFlags::ENABLE.bits(), 0x10);
    }

    #[test]
    fn idle_requires_enable_done_and_nothing_pending() {
        use super::HandshakeFlags as F;
        assert!((F::ENABLE | F::DONE).is_idle());
        assert!(!(F::DONE).is_idle()); // control not granted
        assert!(!(F::ENABLE).is_idle()); // previous point unfinished
        assert!(!(F::ENABLE | F::DONE | F::BUSY).is_idle());
        assert!(!(F::ENABLE | F::DONE | F::NEW_POINT).is_idle());
    }

    #[test]
    fn staging_clears_stale_done_and_raises_trigger() {
        let mut buf = [0u8; REGION_LEN];
        buf[OFF_FLAGS] = (HandshakeFlags::ENABLE | HandshakeFlags::DONE).bits();

        let point = TrajectoryPoint::new(Point2D::new(10.0, 20.0), 5.0, 7);
        stage_point(&mut buf, &point);

        let flags = flags_of(&buf);
        assert!(flags.contains(HandshakeFlags::NEW_POINT));
        assert!(flags.contains(HandshakeFlags::ENABLE));
        assert!(!flags.contains(HandshakeFlags::DONE));
    }

    #[test]
    fn staging_preserves_controller_owned_bits() {
        let mut buf = [0u8; REGION_LEN];
        buf[OFF_FLAGS] = (HandshakeFlags::BUSY | HandshakeFlags::FAULT).bits();

        let point = TrajectoryPoint::new(Point2D::new(1.0, 2.0), 3.0, 0);
        stage_point(&mut buf, &point);

        let flags = flags_of(&buf);
        assert!(flags.contains(HandshakeFlags::BUSY));
        assert!(flags.contains(HandshakeFlags::FAULT));
    }

    #[test]
    fn index_zero_is_a_valid_point() {
        let mut buf = [0u8; REGION_LEN];
        let point = TrajectoryPoint::new(Point2D::new(491.3, 133.9), 50.0, 0);
        stage_point(&mut buf, &point);

        let staged = decode_point(&buf);
        assert_eq!(staged.index, 0);
        assert!(flags_of(&buf).contains(HandshakeFlags::NEW_POINT));
    }

    #[test]
    fn reals_are_big_endian() {
        let mut buf = [0u8; REGION_LEN];
        set_real(&mut buf, OFF_X, 1.0);
        // IEEE-754 single 1.0 = 0x3F80_0000, most significant byte first.
        assert_eq!(&buf[OFF_X..OFF_X + 4], &[0x3F, 0x80, 0x00, 0x00]);

        set_int(&mut buf, OFF_INDEX, 0x0102);
        assert_eq!(&buf[OFF_INDEX..OFF_INDEX + 2], &[0x01, 0x02]);
    }

    proptest! {
        #[test]
        fn staged_fields_round_trip(
            x in -2000.0..2000.0f64,
            y in -2000.0..2000.0f64,
            v in 0.1..500.0f64,
            index in 0u32..32767,
        ) {
            let mut buf = [0u8; REGION_LEN];
            let point = TrajectoryPoint::new(Point2D::new(x, y), v, index);
            stage_point(&mut buf, &point);
            let staged = decode_point(&buf);

            // Values survive the f64 → REAL narrowing within f32 precision.
            prop_assert!((staged.x - x).abs() <= (x.abs() + 1.0) * 1e-6);
            prop_assert!((staged.y - y).abs() <= (y.abs() + 1.0) * 1e-6);
            prop_assert!((staged.velocity - v).abs() <= (v.abs() + 1.0) * 1e-6);
            prop_assert_eq!(staged.index as u32, index);
        }
    }
}
