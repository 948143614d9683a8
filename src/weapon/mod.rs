//! Weapon model: charge catalog, projectile parameters and static weapon profiles.

mod catalog;

pub use catalog::{find_profile, ProjectileProfile, WeaponProfile, DEFAULT_WEAPON_CATALOG};

use crate::config::{DEFAULT_BASE_VELOCITY_MPS, DEFAULT_CHARGES};
use crate::config::{DEFAULT_AIR_DRAG, DEFAULT_SHELL_MASS_KG};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeaponError {
    #[error("invalid charge: {0}")]
    InvalidCharge(u32),
}

/// Shell parameters fed to the integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub mass_kg: f64,
    /// Quadratic drag coefficient; deceleration = (drag_coeff / mass) * |v_rel|².
    pub drag_coeff: f64,
}

impl Default for Projectile {
    fn default() -> Self {
        Self {
            mass_kg: DEFAULT_SHELL_MASS_KG,
            drag_coeff: DEFAULT_AIR_DRAG,
        }
    }
}

/// A gun with its charge table. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    base_speed: f64,
    charges: BTreeMap<u32, f64>,
    pub projectile: Projectile,
}

impl Weapon {
    pub fn new(base_speed: f64, charges: BTreeMap<u32, f64>, projectile: Projectile) -> Self {
        Self {
            base_speed,
            charges,
            projectile,
        }
    }

    pub fn base_speed(&self) -> f64 {
        self.base_speed
    }

    /// Charge ids in ascending order.
    pub fn charge_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.charges.keys().copied()
    }

    pub fn charges(&self) -> &BTreeMap<u32, f64> {
        &self.charges
    }

    /// Muzzle velocity for a charge: base speed times the charge multiplier.
    pub fn v0_for_charge(&self, charge: u32) -> Result<f64, WeaponError> {
        self.charges
            .get(&charge)
            .map(|m| self.base_speed * m)
            .ok_or(WeaponError::InvalidCharge(charge))
    }
}

impl Default for Weapon {
    fn default() -> Self {
        Self::new(
            DEFAULT_BASE_VELOCITY_MPS,
            DEFAULT_CHARGES.iter().copied().collect(),
            Projectile::default(),
        )
    }
}
