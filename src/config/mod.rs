//! Configuration: physical constants, solver defaults and the TOML-loadable weapon setup.

use crate::weapon::{Projectile, Weapon};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Gravitational acceleration (m/s²).
pub const G: f64 = 9.81;

/// Mils in a full circle.
pub const MIL_CIRCLE: f64 = 6400.0;

/// Highest elevation the gun can be laid at (mil).
pub const MAX_ELEVATION_MIL: f64 = 1500.0;

/// Boundary between the low and high firing arcs (mil).
pub const LOW_HIGH_SPLIT_MIL: f64 = 650.0;

/// Upper bound of the direct-fire band (mil).
pub const DIRECT_FIRE_MAX_MIL: f64 = 250.0;

/// Muzzle velocity of charge multiplier 1.0 (m/s) when no config overrides it.
pub const DEFAULT_BASE_VELOCITY_MPS: f64 = 100.0;

/// Shell mass (kg) when no config overrides it.
pub const DEFAULT_SHELL_MASS_KG: f64 = 3.1;

/// Quadratic drag coefficient; deceleration is `(drag / mass) * |v_rel|²`.
pub const DEFAULT_AIR_DRAG: f64 = 0.0005;

/// Default charge id → muzzle-velocity multiplier table.
pub const DEFAULT_CHARGES: [(u32, f64); 5] = [(1, 1.0), (2, 1.4), (3, 1.8), (4, 2.2), (5, 2.6)];

/// Default integration step (s).
pub const DEFAULT_STEP_TIME_S: f64 = 0.02;

/// Default maximum simulated flight time (s).
pub const DEFAULT_TIME_TO_LIVE_S: f64 = 90.0;

/// Default acceptable miss radius (m).
pub const DEFAULT_TOLERANCE_M: f64 = 5.0;

/// Largest step budget (ttl / dt) a request may ask for.
pub const MAX_STEP_BUDGET: usize = 1_000_000;

/// Maximum size in bytes for a single table file, and for any decoded member in it.
pub const MAX_TABLE_FILE_BYTES: u64 = 64 * 1024 * 1024;

pub const DIRECT_TABLE_FILE: &str = "ballistic_direct.npz";
pub const LOW_TABLE_FILE: &str = "ballistic_low.npz";
pub const HIGH_TABLE_FILE: &str = "ballistic_high.npz";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One entry of the charge catalog.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ChargeEntry {
    pub id: u32,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ProjectileConfig {
    #[serde(default = "default_mass")]
    pub mass_kg: f64,
    #[serde(default = "default_drag")]
    pub drag_coeff: f64,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            mass_kg: DEFAULT_SHELL_MASS_KG,
            drag_coeff: DEFAULT_AIR_DRAG,
        }
    }
}

/// Defaults applied to requests built by the CLI.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SolverDefaults {
    #[serde(default = "default_step_time")]
    pub step_time_s: f64,
    #[serde(default = "default_time_to_live")]
    pub time_to_live_s: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance_m: f64,
}

impl Default for SolverDefaults {
    fn default() -> Self {
        Self {
            step_time_s: DEFAULT_STEP_TIME_S,
            time_to_live_s: DEFAULT_TIME_TO_LIVE_S,
            tolerance_m: DEFAULT_TOLERANCE_M,
        }
    }
}

/// Weapon and solver setup, usually read from a TOML file.
///
/// ```toml
/// base_velocity_mps = 100.0
/// table_dir = "tables"
///
/// [[charges]]
/// id = 1
/// multiplier = 1.0
///
/// [projectile]
/// mass_kg = 3.1
/// drag_coeff = 0.0005
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FireConfig {
    #[serde(default = "default_base_velocity")]
    pub base_velocity_mps: f64,
    #[serde(default = "default_charges")]
    pub charges: Vec<ChargeEntry>,
    #[serde(default)]
    pub projectile: ProjectileConfig,
    #[serde(default)]
    pub solver: SolverDefaults,
    /// Folder holding precomputed range tables, if any.
    #[serde(default)]
    pub table_dir: Option<PathBuf>,
}

fn default_base_velocity() -> f64 {
    DEFAULT_BASE_VELOCITY_MPS
}

fn default_charges() -> Vec<ChargeEntry> {
    DEFAULT_CHARGES
        .iter()
        .map(|&(id, multiplier)| ChargeEntry { id, multiplier })
        .collect()
}

fn default_mass() -> f64 {
    DEFAULT_SHELL_MASS_KG
}

fn default_drag() -> f64 {
    DEFAULT_AIR_DRAG
}

fn default_step_time() -> f64 {
    DEFAULT_STEP_TIME_S
}

fn default_time_to_live() -> f64 {
    DEFAULT_TIME_TO_LIVE_S
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE_M
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            base_velocity_mps: DEFAULT_BASE_VELOCITY_MPS,
            charges: default_charges(),
            projectile: ProjectileConfig::default(),
            solver: SolverDefaults::default(),
            table_dir: None,
        }
    }
}

impl FireConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: FireConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_toml_str(&s)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_velocity_mps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "base_velocity_mps must be positive, got {}",
                self.base_velocity_mps
            )));
        }
        if !(self.projectile.mass_kg > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "projectile.mass_kg must be positive, got {}",
                self.projectile.mass_kg
            )));
        }
        if !(self.projectile.drag_coeff >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "projectile.drag_coeff must be non-negative, got {}",
                self.projectile.drag_coeff
            )));
        }
        let mut seen = BTreeMap::new();
        for c in &self.charges {
            if !(c.multiplier > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "charge {} multiplier must be positive, got {}",
                    c.id, c.multiplier
                )));
            }
            if seen.insert(c.id, c.multiplier).is_some() {
                return Err(ConfigError::Invalid(format!("duplicate charge id {}", c.id)));
            }
        }
        Ok(())
    }

    /// Build the weapon described by this config.
    pub fn weapon(&self) -> Result<Weapon, ConfigError> {
        self.validate()?;
        let charges = self.charges.iter().map(|c| (c.id, c.multiplier)).collect();
        Ok(Weapon::new(
            self.base_velocity_mps,
            charges,
            Projectile {
                mass_kg: self.projectile.mass_kg,
                drag_coeff: self.projectile.drag_coeff,
            },
        ))
    }
}
