//! TOML configuration loading and validation.
//!
//! Loads the per-session `ScribeConfig` once before the core starts; the
//! core never mutates it. Every table carries serde defaults, so an empty
//! file is a valid configuration.
//!
//! # TOML Example
//!
//! ```toml
//! mode = "gateway"
//!
//! [link]
//! address = "192.168.0.1"
//! rack = 0
//! slot = 1
//! data_block = 200
//! done_timeout_s = 30.0
//! poll_interval_ms = 10
//!
//! [motion]
//! velocity = 50.0
//!
//! [trajectory]
//! center_x = 491.3
//! center_y = 133.9
//! radius = 182.4
//! points = 300
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::consts::{
    DEFAULT_ADDRESS, DEFAULT_DATA_BLOCK, DEFAULT_DONE_TIMEOUT_S,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_VELOCITY,
};

// ─── Error type ─────────────────────────────────────────────────────

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path that was attempted.
        path: PathBuf,
    },

    /// File read or TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

// ─── Link mode ──────────────────────────────────────────────────────

/// Which controller transport the session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// The data-block image exported by the fieldbus gateway.
    #[default]
    Gateway,
    /// The in-process simulated controller.
    Sim,
}

impl LinkMode {
    /// Parse a mode string, falling back to [`LinkMode::Sim`] with a
    /// warning when the value is not recognized.
    pub fn parse_lossy(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gateway" => Self::Gateway,
            "sim" => Self::Sim,
            other => {
                warn!("unsupported link mode '{other}', falling back to sim");
                Self::Sim
            }
        }
    }
}

// ─── Config tables ──────────────────────────────────────────────────

/// Controller connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Controller address (also keys the gateway region name).
    pub address: String,
    /// Rack index of the addressing triple.
    pub rack: u16,
    /// Slot index of the addressing triple.
    pub slot: u16,
    /// Data-block identifier holding the handshake image.
    pub data_block: u16,
    /// Bound for a single point's motion to complete [s].
    pub done_timeout_s: f64,
    /// Controller status poll interval [ms].
    pub poll_interval_ms: u64,
    /// Directory where the gateway exports data-block images.
    pub region_dir: PathBuf,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            rack: 0,
            slot: 1,
            data_block: DEFAULT_DATA_BLOCK,
            done_timeout_s: DEFAULT_DONE_TIMEOUT_S,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            region_dir: PathBuf::from("/dev/shm"),
        }
    }
}

impl LinkConfig {
    /// Status poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-point completion bound as a [`Duration`].
    pub fn done_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.done_timeout_s)
    }

    /// Path of the gateway-exported region for this addressing triple.
    pub fn region_path(&self) -> PathBuf {
        self.region_dir.join(format!(
            "s7gw_{}_r{}s{}_db{}",
            self.address, self.rack, self.slot, self.data_block
        ))
    }
}

/// Motion parameters applied by the trajectory producers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Feed velocity [mm/s].
    pub velocity: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            velocity: DEFAULT_VELOCITY,
        }
    }
}

/// Demo circle trajectory parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleConfig {
    /// Circle center X [mm].
    pub center_x: f64,
    /// Circle center Y [mm].
    pub center_y: f64,
    /// Circle radius [mm].
    pub radius: f64,
    /// Number of points around the circle.
    pub points: usize,
    /// Starting angle [degrees].
    pub start_angle_deg: f64,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            center_x: 491.3,
            center_y: 133.9,
            radius: 182.4,
            points: 300,
            start_angle_deg: 0.0,
        }
    }
}

/// Complete per-session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeConfig {
    /// Controller transport selection.
    pub mode: LinkMode,
    /// Connection parameters.
    pub link: LinkConfig,
    /// Motion parameters.
    pub motion: MotionConfig,
    /// Demo trajectory parameters.
    pub trajectory: CircleConfig,
}

impl ScribeConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Parse(e.to_string())
            }
        })?;

        let config: Self =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.motion.velocity > 0.0) {
            return Err(ConfigError::Validation(format!(
                "motion.velocity must be positive, got {}",
                self.motion.velocity
            )));
        }
        if !(self.link.done_timeout_s > 0.0) {
            return Err(ConfigError::Validation(format!(
                "link.done_timeout_s must be positive, got {}",
                self.link.done_timeout_s
            )));
        }
        if self.link.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "link.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.trajectory.points == 0 {
            return Err(ConfigError::Validation(
                "trajectory.points must be at least 1".to_string(),
            ));
        }
        if !(self.trajectory.radius > 0.0) {
            return Err(ConfigError::Validation(format!(
                "trajectory.radius must be positive, got {}",
                self.trajectory.radius
            )));
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
