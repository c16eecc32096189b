//! Simulated controller transport.
//!
//! `SimLink` backs the handshake region with in-process memory and models
//! the controller side of the protocol:
//!
//! - a region write with `NEW_POINT` set consumes the staged point
//!   (`BUSY` rises, `NEW_POINT` and `DONE` fall) and logs it;
//! - each flag-byte read while `BUSY` burns one motion poll; when the
//!   budget reaches zero, `DONE` rises and `BUSY` falls — or `FAULT`
//!   rises instead if a fault is scripted for that point index.
//!
//! Pickup of a freshly staged point while the previous one is still busy
//! is counted separately — a correct host never produces one.
//!
//! A [`SimHandle`] shares the controller state with tests for scripting
//! and assertions.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use scribe_common::wire::{
    HandshakeFlags, OFF_FLAGS, REGION_LEN, StagedPoint, decode_point,
};

use crate::{ControllerLink, LinkError, check_bounds};

/// Default flag-byte reads a simulated motion takes to complete.
const DEFAULT_MOTION_POLLS: u32 = 2;

// ─── Controller state ───────────────────────────────────────────────

struct SimState {
    region: [u8; REGION_LEN],
    /// Every consumed point, in pickup order.
    writes: Vec<StagedPoint>,
    /// Points staged while the previous motion was still busy.
    overlapped_writes: usize,
    /// Flag-byte reads a motion takes to complete.
    motion_polls: u32,
    /// Remaining reads for the motion in flight.
    polls_left: u32,
    /// Raise `FAULT` instead of `DONE` for this point index.
    fail_index: Option<i16>,
    /// The motion in flight will end in `FAULT`.
    fault_pending: bool,
    /// Make `connect` fail (connection-failure scenarios).
    refuse_connect: bool,
}

impl SimState {
    fn new() -> Self {
        let mut region = [0u8; REGION_LEN];
        // Power-on posture: control granted, previous cycle finished.
        region[OFF_FLAGS] = (HandshakeFlags::ENABLE | HandshakeFlags::DONE).bits();
        Self {
            region,
            writes: Vec::new(),
            overlapped_writes: 0,
            motion_polls: DEFAULT_MOTION_POLLS,
            polls_left: 0,
            fail_index: None,
            fault_pending: false,
            refuse_connect: false,
        }
    }

    fn flags(&self) -> HandshakeFlags {
        HandshakeFlags::from_bits_truncate(self.region[OFF_FLAGS])
    }

    fn set_flags(&mut self, flags: HandshakeFlags) {
        self.region[OFF_FLAGS] = flags.bits();
    }

    /// Host wrote the region: pick up a staged point if one was triggered.
    fn after_write(&mut self, offset: usize, len: usize) {
        if offset + len <= OFF_FLAGS {
            return; // flag byte untouched, nothing to pick up
        }
        let mut flags = self.flags();
        if !flags.contains(HandshakeFlags::NEW_POINT) {
            return;
        }

        if flags.contains(HandshakeFlags::BUSY) {
            self.overlapped_writes += 1;
        }

        let staged = decode_point(&self.region);
        debug!("sim controller picked up point {}", staged.index);
        self.writes.push(staged);
        self.fault_pending = self.fail_index == Some(staged.index);
        self.polls_left = self.motion_polls;

        flags.remove(HandshakeFlags::NEW_POINT | HandshakeFlags::DONE);
        flags.insert(HandshakeFlags::BUSY);
        self.set_flags(flags);
    }

    /// Host is about to read: advance the motion if it is being polled.
    fn before_read(&mut self, offset: usize, len: usize) {
        if offset > OFF_FLAGS || offset + len <= OFF_FLAGS {
            return; // not a flag-byte read
        }
        let mut flags = self.flags();
        if !flags.contains(HandshakeFlags::BUSY) {
            return;
        }
        self.polls_left = self.polls_left.saturating_sub(1);
        if self.polls_left == 0 {
            flags.remove(HandshakeFlags::BUSY);
            if self.fault_pending {
                flags.insert(HandshakeFlags::FAULT);
                debug!("sim controller raising fault");
            } else {
                flags.insert(HandshakeFlags::DONE);
            }
            self.set_flags(flags);
        }
    }
}

// ─── Link ───────────────────────────────────────────────────────────

/// In-process simulated controller.
pub struct SimLink {
    state: Arc<Mutex<SimState>>,
    connected: bool,
}

impl SimLink {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new())),
            connected: false,
        }
    }

    /// Handle for scripting the controller and inspecting its log.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimLink {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerLink for SimLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        if self.state.lock().refuse_connect {
            return Err(LinkError::Unreachable {
                reason: "simulated controller refused the connection".to_string(),
            });
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_region(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        check_bounds(offset, buf.len(), REGION_LEN)?;
        let mut state = self.state.lock();
        state.before_read(offset, buf.len());
        buf.copy_from_slice(&state.region[offset..offset + buf.len()]);
        Ok(())
    }

    fn write_region(&mut self, offset: usize, data: &[u8]) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        check_bounds(offset, data.len(), REGION_LEN)?;
        let mut state = self.state.lock();
        state.region[offset..offset + data.len()].copy_from_slice(data);
        state.after_write(offset, data.len());
        Ok(())
    }

    fn describe(&self) -> String {
        "simulated controller".to_string()
    }
}

// ─── Test handle ────────────────────────────────────────────────────

/// Scripting and inspection handle shared with a [`SimLink`].
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimHandle {
    /// Points the controller has picked up, in pickup order.
    pub fn writes(&self) -> Vec<StagedPoint> {
        self.state.lock().writes.clone()
    }

    /// Number of points picked up so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Points staged while the previous motion was still busy.
    pub fn overlapped_writes(&self) -> usize {
        self.state.lock().overlapped_writes
    }

    /// Flag-byte reads a motion takes to complete (applies from the next
    /// pickup).
    pub fn set_motion_polls(&self, polls: u32) {
        self.state.lock().motion_polls = polls;
    }

    /// Script a fault for the given point index.
    pub fn fail_at_index(&self, index: i16) {
        self.state.lock().fail_index = Some(index);
    }

    /// Remove a scripted fault (operator acknowledgment).
    pub fn clear_failure(&self) {
        self.state.lock().fail_index = None;
    }

    /// Grant or revoke external control directly (the physical selector
    /// switch on the controller side).
    pub fn set_enable(&self, enable: bool) {
        let mut state = self.state.lock();
        let mut flags = state.flags();
        flags.set(HandshakeFlags::ENABLE, enable);
        state.set_flags(flags);
    }

    /// Overwrite the whole flag byte (arbitrary controller postures).
    pub fn set_flags(&self, flags: HandshakeFlags) {
        self.state.lock().set_flags(flags);
    }

    /// Make subsequent `connect` calls fail.
    pub fn refuse_connect(&self, refuse: bool) {
        self.state.lock().refuse_connect = refuse;
    }

    /// Current flag byte.
    pub fn flags(&self) -> HandshakeFlags {
        self.state.lock().flags()
    }

    /// Raw copy of the region.
    pub fn region_snapshot(&self) -> [u8; REGION_LEN] {
        self.state.lock().region
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_common::geom::{Point2D, TrajectoryPoint};
    use scribe_common::wire::stage_point;

    fn staged_region(link: &mut SimLink, x: f64, y: f64, index: u32) {
        let mut buf = [0u8; REGION_LEN];
        link.read_region(0, &mut buf).unwrap();
        stage_point(
            &mut buf,
            &TrajectoryPoint::new(Point2D::new(x, y), 5.0, index),
        );
        link.write_region(0, &buf).unwrap();
    }

    fn read_flags(link: &mut SimLink) -> HandshakeFlags {
        let mut byte = [0u8];
        link.read_region(OFF_FLAGS, &mut byte).unwrap();
        HandshakeFlags::from_bits_truncate(byte[0])
    }

    #[test]
    fn powers_on_idle() {
        let mut link = SimLink::new();
        link.connect().unwrap();
        assert!(read_flags(&mut link).is_idle());
    }

    #[test]
    fn staged_point_is_consumed_and_completes_after_two_polls() {
        let mut link = SimLink::new();
        let handle = link.handle();
        link.connect().unwrap();

        staged_region(&mut link, 10.0, 20.0, 0);
        assert_eq!(handle.write_count(), 1);

        // First poll: still busy.
        let flags = read_flags(&mut link);
        assert!(flags.contains(HandshakeFlags::BUSY));
        assert!(!flags.contains(HandshakeFlags::DONE));

        // Second poll: done.
        let flags = read_flags(&mut link);
        assert!(!flags.contains(HandshakeFlags::BUSY));
        assert!(flags.contains(HandshakeFlags::DONE));

        let writes = handle.writes();
        assert_eq!(writes[0].index, 0);
        assert!((writes[0].x - 10.0).abs() < 1e-5);
    }

    #[test]
    fn scripted_fault_raises_fault_bit() {
        let mut link = SimLink::new();
        let handle = link.handle();
        handle.fail_at_index(3);
        link.connect().unwrap();

        staged_region(&mut link, 1.0, 1.0, 3);
        let _ = read_flags(&mut link);
        let flags = read_flags(&mut link);
        assert!(flags.contains(HandshakeFlags::FAULT));
        assert!(!flags.contains(HandshakeFlags::DONE));
    }

    #[test]
    fn overlapped_staging_is_counted() {
        let mut link = SimLink::new();
        let handle = link.handle();
        handle.set_motion_polls(1000);
        link.connect().unwrap();

        staged_region(&mut link, 1.0, 1.0, 0);
        // Previous motion still busy — staging again is a protocol breach.
        staged_region(&mut link, 2.0, 2.0, 1);
        assert_eq!(handle.overlapped_writes(), 1);
    }

    #[test]
    fn refused_connect_reports_unreachable() {
        let mut link = SimLink::new();
        link.handle().refuse_connect(true);
        assert!(matches!(
            link.connect(),
            Err(LinkError::Unreachable { .. })
        ));
    }
}
