//! Memory-mapped gateway region transport.
//!
//! The fieldbus gateway bridges the controller's data block into a file
//! under a shm-style directory, named from the addressing triple
//! (`s7gw_<address>_r<rack>s<slot>_db<db>`). This link maps that file and
//! performs plain byte copies; a release fence after each write keeps the
//! image ordered for the gateway process.

use std::fs::OpenOptions;
use std::sync::atomic::{Ordering, fence};

use memmap2::MmapMut;
use tracing::{debug, info};

use scribe_common::config::LinkConfig;
use scribe_common::wire::REGION_LEN;

use crate::{ControllerLink, LinkError, check_bounds};

/// Production transport: the gateway-exported data-block image.
pub struct MappedLink {
    config: LinkConfig,
    map: Option<MmapMut>,
}

impl MappedLink {
    /// Create an unconnected link for the given addressing triple.
    pub fn new(config: LinkConfig) -> Self {
        Self { config, map: None }
    }
}

impl ControllerLink for MappedLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        let path = self.config.region_path();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| LinkError::Unreachable {
                reason: format!("{}: {e}", path.display()),
            })?;

        let actual = file.metadata()?.len() as usize;
        if actual < REGION_LEN {
            return Err(LinkError::RegionTooSmall {
                actual,
                required: REGION_LEN,
            });
        }

        // Safety: the gateway creates the file with a fixed size and never
        // truncates it while exporting.
        let map = unsafe { MmapMut::map_mut(&file)? };
        self.map = Some(map);

        info!("attached to {}", path.display());
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.map.take().is_some() {
            debug!("detached from {}", self.config.region_path().display());
        }
    }

    fn is_connected(&self) -> bool {
        self.map.is_some()
    }

    fn read_region(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), LinkError> {
        let map = self.map.as_ref().ok_or(LinkError::NotConnected)?;
        check_bounds(offset, buf.len(), REGION_LEN)?;
        buf.copy_from_slice(&map[offset..offset + buf.len()]);
        Ok(())
    }

    fn write_region(&mut self, offset: usize, data: &[u8]) -> Result<(), LinkError> {
        let map = self.map.as_mut().ok_or(LinkError::NotConnected)?;
        check_bounds(offset, data.len(), REGION_LEN)?;
        map[offset..offset + data.len()].copy_from_slice(data);
        fence(Ordering::Release);
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "gateway region {} (addr {}, rack {}, slot {}, db {})",
            self.config.region_path().display(),
            self.config.address,
            self.config.rack,
            self.config.slot,
            self.config.data_block
        )
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
