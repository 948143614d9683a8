//! Shared utilities: logging and angle units.

use crate::config::MIL_CIRCLE;
use std::f64::consts::TAU;
use tracing::Level;

/// Initialize tracing with env filter. Safe to call once at startup.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Radians to mils, wrapped into [0, 6400).
pub fn rad_to_mil(rad: f64) -> f64 {
    rad.rem_euclid(TAU) * (MIL_CIRCLE / TAU)
}

pub fn mil_to_rad(mil: f64) -> f64 {
    (mil / MIL_CIRCLE) * TAU
}

pub fn mil_to_deg(mil: f64) -> f64 {
    mil_to_rad(mil).to_degrees()
}
