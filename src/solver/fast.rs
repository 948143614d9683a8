//! Table-seeded solve: start at the tabulated elevation whose range is closest
//! to the target, then refine with a shrinking window of simulated shots.

use super::{evaluate, improves, SolveError};
use crate::config::MAX_ELEVATION_MIL;
use crate::model::{ShotResult, SolveRequest};
use crate::tables::{TableManager, TableSet};
use crate::weapon::Weapon;

/// Half-width of the first refinement window (mil).
pub const INITIAL_WINDOW_MIL: f64 = 50.0;
pub const WINDOW_SHRINK: f64 = 0.45;
pub const MIN_WINDOW_MIL: f64 = 6.0;
pub const REFINE_ROUNDS: usize = 4;
/// Evenly spaced samples per round, window ends included.
pub const REFINE_SAMPLES: usize = 11;

pub fn next_window(window: f64) -> f64 {
    (window * WINDOW_SHRINK).max(MIN_WINDOW_MIL)
}

/// Window half-widths used by each refinement round.
pub fn window_schedule() -> [f64; REFINE_ROUNDS] {
    let mut out = [INITIAL_WINDOW_MIL; REFINE_ROUNDS];
    for i in 1..REFINE_ROUNDS {
        out[i] = next_window(out[i - 1]);
    }
    out
}

fn sample_window(center: f64, window: f64) -> [f64; REFINE_SAMPLES] {
    let lo = (center - window).max(0.0);
    let hi = (center + window).min(MAX_ELEVATION_MIL);
    let last = (REFINE_SAMPLES - 1) as f64;
    let mut out = [hi; REFINE_SAMPLES];
    for (i, e) in out.iter_mut().enumerate().take(REFINE_SAMPLES - 1) {
        *e = lo + (hi - lo) * i as f64 / last;
    }
    out
}

/// Refine around `seed`, folding candidates into `best`. Returns true as soon as
/// `best` is within tolerance at the end of a round.
fn refine<F>(seed: f64, best: &mut Option<ShotResult>, tolerance_m: f64, mut eval: F) -> bool
where
    F: FnMut(f64) -> ShotResult,
{
    let mut center = seed;
    let mut window = INITIAL_WINDOW_MIL;
    for _ in 0..REFINE_ROUNDS {
        let mut local: Option<ShotResult> = None;
        for elevation in sample_window(center, window) {
            let r = eval(elevation);
            if improves(&r, local.as_ref()) {
                local = Some(r);
            }
        }
        let Some(local) = local else {
            break;
        };
        if improves(&local, best.as_ref()) {
            *best = Some(local);
        }
        center = local.elevation_mil;
        window = next_window(window);
        if best.is_some_and(|b| b.within(tolerance_m)) {
            return true;
        }
    }
    false
}

/// Table-seeded solve. `Ok(None)` when the manager has no tables loaded or no
/// charge in the admissible tables yields a seed.
pub fn fast_solve(
    req: &SolveRequest,
    weapon: &Weapon,
    tables: &TableManager,
) -> Result<Option<ShotResult>, SolveError> {
    if !tables.loaded() {
        return Ok(None);
    }
    req.validate()?;
    refine_from_tables(
        &tables.sets_for(req),
        req.target_range_m,
        req.tolerance_m,
        |charge| Ok(weapon.v0_for_charge(charge)?),
        |charge, v0, elevation| evaluate(req, &weapon.projectile, charge, v0, elevation),
    )
}

/// Refine every charge of every set in order, returning as soon as one charge
/// leaves the best candidate within tolerance.
fn refine_from_tables<V, F>(
    sets: &[&TableSet],
    target_range_m: f64,
    tolerance_m: f64,
    mut v0_for: V,
    mut eval: F,
) -> Result<Option<ShotResult>, SolveError>
where
    V: FnMut(u32) -> Result<f64, SolveError>,
    F: FnMut(u32, f64, f64) -> ShotResult,
{
    let mut best: Option<ShotResult> = None;
    for set in sets {
        for &charge in set.charges() {
            let v0 = v0_for(charge)?;
            let Some(seed) = set.guess_elevation(charge, target_range_m) else {
                continue;
            };
            let hit = refine(seed, &mut best, tolerance_m, |elevation| {
                eval(charge, v0, elevation)
            });
            if hit {
                tracing::debug!(
                    "table solve: charge {} from seed {:.1} mil in {}",
                    charge,
                    seed,
                    set.path().display()
                );
                return Ok(best);
            }
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballistics::{impact_range, simulate, LaunchParams};
    use crate::model::{Arc, Band};
    use crate::solver::suggest_best;
    use crate::tables::{build_table_set, BuildOptions};
    use crate::util::mil_to_rad;
    use crate::weapon::{Projectile, WeaponError};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn fake(elevation_mil: f64, miss: f64) -> ShotResult {
        ShotResult {
            charge: 1,
            elevation_mil,
            muzzle_velocity: 0.0,
            time_of_flight: 0.0,
            miss_total_m: miss,
            miss_range_m: 0.0,
            miss_alt_m: 0.0,
            miss_drift_m: 0.0,
        }
    }

    #[test]
    fn window_shrinks_to_floor() {
        let w = window_schedule();
        assert_eq!(w[0], 50.0);
        assert!((w[1] - 22.5).abs() < 1e-12);
        assert!((w[2] - 10.125).abs() < 1e-12);
        assert_eq!(w[3], MIN_WINDOW_MIL);
        assert_eq!(next_window(MIN_WINDOW_MIL), MIN_WINDOW_MIL);
    }

    #[test]
    fn samples_are_clamped_and_evenly_spaced() {
        let s = sample_window(10.0, 50.0);
        assert_eq!(s[0], 0.0);
        assert_eq!(s[10], 60.0);
        assert!((s[1] - 6.0).abs() < 1e-12);
        let top = sample_window(1490.0, 50.0);
        assert_eq!(top[10], MAX_ELEVATION_MIL);
        assert_eq!(top[0], 1440.0);
    }

    #[test]
    fn refine_runs_all_rounds_without_hit() {
        let mut calls = 0;
        let mut best = None;
        let hit = refine(400.0, &mut best, 0.1, |e| {
            calls += 1;
            fake(e, 5.0 + (e - 437.0).abs())
        });
        assert!(!hit);
        assert_eq!(calls, REFINE_ROUNDS * REFINE_SAMPLES);
        let b = best.unwrap();
        assert!((b.elevation_mil - 437.0).abs() < 1.5, "{}", b.elevation_mil);
    }

    #[test]
    fn refine_stops_after_first_round_within_tolerance() {
        let mut calls = 0;
        let mut best = None;
        let hit = refine(400.0, &mut best, 5.0, |e| {
            calls += 1;
            fake(e, (e - 420.0).abs())
        });
        assert!(hit);
        assert_eq!(calls, REFINE_SAMPLES);
        assert_eq!(best.unwrap().elevation_mil, 420.0);
    }

    #[test]
    fn refine_keeps_better_earlier_best() {
        let mut best = Some(fake(10.0, 0.5));
        let hit = refine(400.0, &mut best, 0.1, |e| fake(e, 3.0));
        assert!(!hit);
        assert_eq!(best.unwrap().elevation_mil, 10.0);
    }

    fn two_charge_set(name: &str, elevations: Vec<f64>) -> TableSet {
        let ranges: Vec<f64> = elevations.iter().map(|e| e * 2.0).collect();
        TableSet::from_arrays(
            PathBuf::from(name),
            [
                ("elev_mil".to_string(), elevations),
                ("charges_id".to_string(), vec![1.0, 2.0]),
                ("range_c1".to_string(), ranges.clone()),
                ("range_c2".to_string(), ranges),
            ]
            .into_iter()
            .collect::<BTreeMap<_, _>>(),
        )
        .unwrap()
    }

    fn low_and_high() -> TableManager {
        let low = two_charge_set("low.npz", vec![0.0, 200.0, 400.0, 600.0]);
        let high = two_charge_set("high.npz", vec![700.0, 1000.0, 1300.0]);
        TableManager::from_sets(low.clone(), low, high)
    }

    #[test]
    fn hit_on_first_charge_skips_other_charges_and_sets() {
        let tm = low_and_high();
        let req = SolveRequest::new(800.0, 0.0);
        assert_eq!(req.arc, Arc::Any);
        let sets = tm.sets_for(&req);
        assert_eq!(sets.len(), 2);
        let mut calls = Vec::new();
        let best = refine_from_tables(&sets, req.target_range_m, 5.0, |_| Ok(100.0), |c, v0, e| {
            calls.push((c, e));
            let mut r = fake(e, 0.5);
            r.charge = c;
            r.muzzle_velocity = v0;
            r
        })
        .unwrap()
        .unwrap();
        assert_eq!(calls.len(), REFINE_SAMPLES);
        assert!(calls.iter().all(|&(c, e)| c == 1 && e < 650.0));
        assert_eq!(best.charge, 1);
    }

    #[test]
    fn without_hit_every_charge_of_every_set_is_refined() {
        let tm = low_and_high();
        let req = SolveRequest::new(800.0, 0.0);
        let mut calls = 0;
        let mut high_calls = 0;
        let best = refine_from_tables(&tm.sets_for(&req), 800.0, 0.1, |_| Ok(100.0), |_, _, e| {
            calls += 1;
            if e > 650.0 {
                high_calls += 1;
            }
            fake(e, 10.0)
        })
        .unwrap();
        assert_eq!(calls, 2 * 2 * REFINE_ROUNDS * REFINE_SAMPLES);
        assert!(high_calls > 0);
        assert!(best.is_some());
    }

    #[test]
    fn unloaded_tables_give_nothing() {
        let req = SolveRequest::new(800.0, 0.0);
        assert_eq!(
            fast_solve(&req, &Weapon::default(), &TableManager::new()),
            Ok(None)
        );
    }

    fn test_weapon() -> Weapon {
        Weapon::new(
            150.0,
            [(1, 1.0)].into_iter().collect(),
            Projectile {
                mass_kg: 3.0,
                drag_coeff: 0.0003,
            },
        )
    }

    fn tables_for(weapon: &Weapon, step_time: f64) -> TableManager {
        let opts = BuildOptions {
            step_mil: 10.0,
            step_time,
            ..BuildOptions::default()
        };
        let set = |band| build_table_set(weapon, band, &opts).to_table_set().unwrap();
        TableManager::from_sets(set(Band::Direct), set(Band::Low), set(Band::High))
    }

    #[test]
    fn agrees_with_brute_force() {
        let w = test_weapon();
        let tr = simulate(&LaunchParams {
            v0: 150.0,
            elevation_rad: mil_to_rad(300.0),
            mass_kg: w.projectile.mass_kg,
            drag_coeff: w.projectile.drag_coeff,
            wind: Default::default(),
            step_time: 0.01,
            time_to_live: 60.0,
            stop_on_ground: true,
        });
        let (range, _) = impact_range(&tr);
        let mut req = SolveRequest::new(range, 0.0);
        req.arc = Arc::Low;
        req.step_time = 0.01;
        req.tolerance_m = 1.0;

        let tm = tables_for(&w, 0.01);
        let fast = fast_solve(&req, &w, &tm).unwrap().unwrap();
        let brute = suggest_best(&req, &w).unwrap().unwrap();
        assert_eq!(fast.charge, brute.charge);
        assert!(
            (fast.elevation_mil - brute.elevation_mil).abs() <= 5.0,
            "fast {} vs brute {}",
            fast.elevation_mil,
            brute.elevation_mil
        );
        assert!(fast.within(req.tolerance_m));
    }

    #[test]
    fn unknown_table_charge_is_error() {
        let low = TableSet::from_arrays(
            PathBuf::from("low.npz"),
            [
                ("elev_mil".to_string(), vec![0.0, 100.0, 200.0]),
                ("charges_id".to_string(), vec![9.0]),
                ("range_c9".to_string(), vec![0.0, 400.0, 700.0]),
            ]
            .into_iter()
            .collect::<BTreeMap<_, _>>(),
        )
        .unwrap();
        let tm = TableManager::from_sets(low.clone(), low.clone(), low);
        let mut req = SolveRequest::new(500.0, 0.0);
        req.arc = Arc::Low;
        assert_eq!(
            fast_solve(&req, &test_weapon(), &tm),
            Err(SolveError::Weapon(WeaponError::InvalidCharge(9)))
        );
    }
}
