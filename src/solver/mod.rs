//! Firing-solution search: brute-force grid scan and table-seeded refinement.

mod fast;

pub use fast::{
    fast_solve, next_window, window_schedule, INITIAL_WINDOW_MIL, MIN_WINDOW_MIL, REFINE_ROUNDS,
    REFINE_SAMPLES, WINDOW_SHRINK,
};

use crate::ballistics::{closest_approach, simulate, LaunchParams};
use crate::model::{Band, RequestError, ShotResult, SolveRequest};
use crate::tables::TableManager;
use crate::util::mil_to_rad;
use crate::weapon::{Projectile, Weapon, WeaponError};
use thiserror::Error;

/// Elevation spacing of the brute-force scan (mil).
pub const BRUTE_FORCE_STEP_MIL: f64 = 25.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),
    #[error(transparent)]
    Weapon(#[from] WeaponError),
}

/// Fly one candidate and measure how close it passes to the request's target.
pub fn evaluate(
    req: &SolveRequest,
    projectile: &Projectile,
    charge: u32,
    v0: f64,
    elevation_mil: f64,
) -> ShotResult {
    let tr = simulate(&LaunchParams {
        v0,
        elevation_rad: mil_to_rad(elevation_mil),
        mass_kg: projectile.mass_kg,
        drag_coeff: projectile.drag_coeff,
        wind: req.wind_fireframe,
        step_time: req.step_time,
        time_to_live: req.time_to_live,
        stop_on_ground: true,
    });
    let [tx, ty, tz] = req.target_point();
    let (x, y, z, miss) = match closest_approach(&tr, [tx, ty, tz]) {
        Some(a) => (a.x, a.y, a.z, a.miss),
        None => (0.0, 0.0, 0.0, (tx * tx + ty * ty + tz * tz).sqrt()),
    };
    ShotResult {
        charge,
        elevation_mil,
        muzzle_velocity: v0,
        time_of_flight: tr.time_of_flight(),
        miss_total_m: miss,
        miss_range_m: x - tx,
        miss_alt_m: y - ty,
        miss_drift_m: z - tz,
    }
}

fn improves(candidate: &ShotResult, best: Option<&ShotResult>) -> bool {
    best.map_or(true, |b| candidate.miss_total_m < b.miss_total_m)
}

/// Exhaustive scan: every charge (ascending) × band × 25-mil step. Stops after
/// the first charge/band pass that leaves the best miss within tolerance.
pub fn suggest_best(req: &SolveRequest, weapon: &Weapon) -> Result<Option<ShotResult>, SolveError> {
    req.validate()?;
    let shots: Vec<(u32, f64)> = weapon
        .charges()
        .iter()
        .map(|(&c, &m)| (c, weapon.base_speed() * m))
        .collect();
    Ok(scan_bands(
        &shots,
        Band::for_request(req),
        req.tolerance_m,
        |charge, v0, elevation| evaluate(req, &weapon.projectile, charge, v0, elevation),
    ))
}

fn scan_bands<F>(
    shots: &[(u32, f64)],
    bands: &[Band],
    tolerance_m: f64,
    mut eval: F,
) -> Option<ShotResult>
where
    F: FnMut(u32, f64, f64) -> ShotResult,
{
    let mut best: Option<ShotResult> = None;
    for &(charge, v0) in shots {
        for band in bands {
            for elevation in band.grid(BRUTE_FORCE_STEP_MIL) {
                let r = eval(charge, v0, elevation);
                if improves(&r, best.as_ref()) {
                    best = Some(r);
                }
            }
            if let Some(b) = best.filter(|b| b.within(tolerance_m)) {
                tracing::debug!(
                    "brute force: charge {} band {:?} within tolerance ({:.2} m)",
                    charge,
                    band,
                    b.miss_total_m
                );
                return Some(b);
            }
        }
    }
    best
}

/// Solve with tables when a loaded manager is supplied, otherwise (or when the
/// tables yield no candidate) by brute force.
pub fn solve(
    req: &SolveRequest,
    weapon: &Weapon,
    tables: Option<&TableManager>,
) -> Result<Option<ShotResult>, SolveError> {
    if let Some(tm) = tables.filter(|tm| tm.loaded()) {
        if let Some(r) = fast_solve(req, weapon, tm)? {
            return Ok(Some(r));
        }
        tracing::debug!("tables gave no candidate; falling back to brute force");
    }
    suggest_best(req, weapon)
}
