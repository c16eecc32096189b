//! # Scribe Sync
//!
//! Drives the controller-managed axis pair along a circle trajectory and
//! logs live progress until the run completes.
//!
//! Two transports are available:
//! - **gateway** — attach to the data-block image exported by the
//!   fieldbus gateway (production).
//! - **sim** — the in-process simulated controller (no hardware needed).
//!
//! The transport comes from the config file's `mode` key; `--link`
//! overrides it, and an unknown value falls back to sim with a warning.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use scribe_common::config::{ConfigError, LinkMode, ScribeConfig};
use scribe_common::status::RunState;
use scribe_common::trajectory;
use scribe_link::{ControllerLink, MappedLink, SimLink};
use scribe_sync::{SyncClient, SyncTuning};

/// Scribe Sync — planar trajectory synchronization against a PLC axis pair
#[derive(Parser, Debug)]
#[command(name = "scribe_sync")]
#[command(version)]
#[command(about = "Drives a controller-managed axis pair along a planar trajectory")]
struct Args {
    /// Path to the session configuration TOML.
    #[arg(long, default_value = "config/scribe.toml")]
    config: PathBuf,

    /// Override the controller transport ("gateway" or "sim").
    #[arg(long, value_name = "MODE")]
    link: Option<String>,

    /// Progress report interval in milliseconds.
    #[arg(long, default_value_t = 500)]
    report_ms: u64,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Scribe Sync v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Scribe Sync shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match ScribeConfig::load(&args.config) {
        Ok(config) => config,
        Err(ConfigError::NotFound { path }) => {
            warn!("no config at {}, using defaults", path.display());
            ScribeConfig::default()
        }
        Err(e) => return Err(Box::new(e)),
    };

    let mode = args
        .link
        .as_deref()
        .map(LinkMode::parse_lossy)
        .unwrap_or(config.mode);

    let link: Box<dyn ControllerLink> = match mode {
        LinkMode::Gateway => Box::new(MappedLink::new(config.link.clone())),
        LinkMode::Sim => Box::new(SimLink::new()),
    };
    info!("link: {}", link.describe());

    let mut client = SyncClient::new(link, SyncTuning::from_link(&config.link));
    client.connect()?;

    let points = trajectory::circle_from_config(&config.trajectory, config.motion.velocity);
    info!(
        "trajectory: {} points, radius {:.1} mm around ({:.1}, {:.1})",
        points.len(),
        config.trajectory.radius,
        config.trajectory.center_x,
        config.trajectory.center_y
    );

    client.enqueue_trajectory(points);
    client.start()?;

    // Poll the status record at our own cadence; fatal conditions only
    // ever surface here.
    loop {
        std::thread::sleep(Duration::from_millis(args.report_ms.max(10)));
        let status = client.status();
        info!("{status}");
        match status.state {
            RunState::Done => break,
            RunState::Error => {
                error!(
                    "run failed: {}",
                    status.error_message.unwrap_or_else(|| "unknown".to_string())
                );
                break;
            }
            _ => {}
        }
    }

    client.stop()?;
    client.disconnect();
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
