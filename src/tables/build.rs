//! Offline table generation: sweep each band's elevations for every charge
//! and record where the shell lands.

use super::npy::{encode_f32, encode_i64, write_npz};
use super::{
    drift_sensitivity_array, range_array, range_sensitivity_array, table_file, TableError,
    TableSet, CHARGES_ARRAY, ELEVATION_ARRAY,
};
use crate::ballistics::{impact_point, simulate, LaunchParams};
use crate::config::{DEFAULT_STEP_TIME_S, DEFAULT_TIME_TO_LIVE_S};
use crate::model::{Band, WindFireFrame};
use crate::util::mil_to_rad;
use crate::weapon::Weapon;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Wind speed used for the sensitivity columns (m/s).
const SENSITIVITY_WIND_MPS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildOptions {
    /// Elevation spacing of the table (mil).
    pub step_mil: f64,
    /// Also record drift per 1 m/s cross wind and range change per 1 m/s tail wind.
    pub wind_sensitivity: bool,
    pub step_time: f64,
    pub time_to_live: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            step_mil: 5.0,
            wind_sensitivity: false,
            step_time: DEFAULT_STEP_TIME_S,
            time_to_live: DEFAULT_TIME_TO_LIVE_S,
        }
    }
}

/// One band's table, held in memory before it is written or indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltTable {
    pub band: Band,
    pub elevations: Vec<f64>,
    pub charges: Vec<u32>,
    /// Per charge, index-aligned with `elevations`.
    pub ranges: Vec<Vec<f64>>,
    pub drift1: Option<Vec<Vec<f64>>>,
    pub rdelta1: Option<Vec<Vec<f64>>>,
}

impl BuiltTable {
    fn arrays(&self) -> Vec<(String, Vec<f64>)> {
        let mut out = vec![
            (ELEVATION_ARRAY.to_string(), self.elevations.clone()),
            (
                CHARGES_ARRAY.to_string(),
                self.charges.iter().map(|&c| c as f64).collect(),
            ),
        ];
        for (i, &c) in self.charges.iter().enumerate() {
            out.push((range_array(c), self.ranges[i].clone()));
            if let Some(d) = &self.drift1 {
                out.push((drift_sensitivity_array(c), d[i].clone()));
            }
            if let Some(r) = &self.rdelta1 {
                out.push((range_sensitivity_array(c), r[i].clone()));
            }
        }
        out
    }

    /// Index the table without going through a file.
    pub fn to_table_set(&self) -> Result<TableSet, TableError> {
        let arrays: BTreeMap<String, Vec<f64>> = self.arrays().into_iter().collect();
        TableSet::from_arrays(PathBuf::from(table_file(self.band)), arrays)
    }

    /// Write the table as an `.npz` archive.
    pub fn write(&self, path: &Path) -> Result<(), TableError> {
        let members: Vec<(String, Vec<u8>)> = self
            .arrays()
            .into_iter()
            .map(|(name, values)| {
                let bytes = if name == CHARGES_ARRAY {
                    let ids: Vec<i64> = self.charges.iter().map(|&c| i64::from(c)).collect();
                    encode_i64(&ids)
                } else {
                    encode_f32(&values)
                };
                (name, bytes)
            })
            .collect();
        write_npz(path, &members).map_err(|source| TableError::Archive {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Sweep `band` for every charge of `weapon`. Ranges are the interpolated
/// ground-crossing ranges of calm-air shots.
pub fn build_table_set(weapon: &Weapon, band: Band, opts: &BuildOptions) -> BuiltTable {
    let elevations = band.grid(opts.step_mil);
    let charges: Vec<u32> = weapon.charge_ids().collect();
    let mut ranges = Vec::with_capacity(charges.len());
    let mut drift1 = Vec::new();
    let mut rdelta1 = Vec::new();

    for (&c, &mult) in weapon.charges() {
        let v0 = weapon.base_speed() * mult;
        let land = |elevation_mil: f64, wind: WindFireFrame| {
            impact_point(&simulate(&LaunchParams {
                v0,
                elevation_rad: mil_to_rad(elevation_mil),
                mass_kg: weapon.projectile.mass_kg,
                drag_coeff: weapon.projectile.drag_coeff,
                wind,
                step_time: opts.step_time,
                time_to_live: opts.time_to_live,
                stop_on_ground: true,
            }))
        };
        let calm: Vec<_> = elevations
            .iter()
            .map(|&e| land(e, WindFireFrame::default()))
            .collect();
        if opts.wind_sensitivity {
            let cross = WindFireFrame::new(0.0, SENSITIVITY_WIND_MPS);
            let tail = WindFireFrame::new(SENSITIVITY_WIND_MPS, 0.0);
            drift1.push(elevations.iter().map(|&e| land(e, cross).drift).collect());
            rdelta1.push(
                elevations
                    .iter()
                    .zip(&calm)
                    .map(|(&e, p)| land(e, tail).range - p.range)
                    .collect(),
            );
        }
        ranges.push(calm.iter().map(|p| p.range).collect());
        tracing::debug!("built {:?} table for charge {} ({} rows)", band, c, elevations.len());
    }

    BuiltTable {
        band,
        elevations,
        charges,
        ranges,
        drift1: opts.wind_sensitivity.then_some(drift1),
        rdelta1: opts.wind_sensitivity.then_some(rdelta1),
    }
}

/// Build all three band tables and write them into `dir` under their fixed names.
pub fn write_folder(dir: &Path, weapon: &Weapon, opts: &BuildOptions) -> Result<(), TableError> {
    fs::create_dir_all(dir).map_err(|source| TableError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for band in Band::ALL {
        let table = build_table_set(weapon, band, opts);
        let path = dir.join(table_file(band));
        table.write(&path)?;
        tracing::info!("wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::TableManager;
    use crate::weapon::Projectile;

    fn small_weapon() -> Weapon {
        Weapon::new(
            120.0,
            [(1, 1.0), (2, 1.5)].into_iter().collect(),
            Projectile {
                mass_kg: 3.0,
                drag_coeff: 0.0004,
            },
        )
    }

    fn coarse() -> BuildOptions {
        BuildOptions {
            step_mil: 50.0,
            step_time: 0.05,
            ..BuildOptions::default()
        }
    }

    #[test]
    fn low_band_ranges_grow_with_elevation_and_charge() {
        let t = build_table_set(&small_weapon(), Band::Low, &coarse());
        assert_eq!(t.charges, vec![1, 2]);
        assert_eq!(t.elevations.len(), t.ranges[0].len());
        let r1 = &t.ranges[0];
        for w in r1.windows(2).skip(1) {
            assert!(w[1] > w[0], "low-band range should increase: {r1:?}");
        }
        assert!(t.ranges[1][5] > t.ranges[0][5]);
        assert!(t.drift1.is_none());
    }

    #[test]
    fn sensitivity_columns_have_expected_sign() {
        let opts = BuildOptions {
            wind_sensitivity: true,
            ..coarse()
        };
        let t = build_table_set(&small_weapon(), Band::Low, &opts);
        let drift = &t.drift1.as_ref().unwrap()[0];
        let rdelta = &t.rdelta1.as_ref().unwrap()[0];
        assert!(drift[6] > 0.0);
        assert!(rdelta[6] > 0.0);
        assert!(t.to_table_set().unwrap().has_wind_sensitivity());
    }

    #[test]
    fn written_folder_loads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_folder(dir.path(), &small_weapon(), &coarse()).unwrap();
        let tm = TableManager::from_folder(dir.path()).unwrap();
        assert!(tm.loaded());
        assert_eq!(tm.folder(), Some(dir.path()));
        let high = tm.set(Band::High).unwrap();
        assert_eq!(high.charges(), &[1, 2]);
        assert_eq!(high.elevations().first().copied(), Some(650.0));
        let built = build_table_set(&small_weapon(), Band::High, &coarse());
        let loaded = high.ranges(2).unwrap();
        for (a, b) in built.ranges[1].iter().zip(loaded) {
            assert!((a - b).abs() <= 1e-3 * a.abs().max(1.0));
        }
    }
}
