//! Precomputed range-vs-elevation tables, one file per elevation band.

mod build;
mod npy;

pub use build::{build_table_set, write_folder, BuildOptions, BuiltTable};
pub use npy::{NpyError, NpzError};

use crate::config::{DIRECT_TABLE_FILE, HIGH_TABLE_FILE, LOW_TABLE_FILE, MAX_TABLE_FILE_BYTES};
use crate::model::{Band, SolveRequest};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ELEVATION_ARRAY: &str = "elev_mil";
pub const CHARGES_ARRAY: &str = "charges_id";

pub fn range_array(charge: u32) -> String {
    format!("range_c{charge}")
}

pub fn drift_sensitivity_array(charge: u32) -> String {
    format!("drift1_c{charge}")
}

pub fn range_sensitivity_array(charge: u32) -> String {
    format!("rdelta1_c{charge}")
}

/// Table file name for a band.
pub fn table_file(band: Band) -> &'static str {
    match band {
        Band::Direct => DIRECT_TABLE_FILE,
        Band::Low => LOW_TABLE_FILE,
        Band::High => HIGH_TABLE_FILE,
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is too large: {size} bytes (max {max})", .path.display())]
    TooLarge { path: PathBuf, size: u64, max: u64 },
    #[error("invalid table file {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: NpzError,
    },
    #[error("{} is missing array {name}", .path.display())]
    MissingArray { path: PathBuf, name: String },
    #[error("{}: array {name} has {len} values, expected {expected}", .path.display())]
    LengthMismatch {
        path: PathBuf,
        name: String,
        len: usize,
        expected: usize,
    },
    #[error("{}: invalid charge id {value}", .path.display())]
    InvalidChargeId { path: PathBuf, value: f64 },
    #[error("{}: charge id {charge} listed more than once", .path.display())]
    DuplicateChargeId { path: PathBuf, charge: u32 },
}

/// Range table for one band: elevation samples and, per charge, the ground
/// range reached at each of them.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSet {
    path: PathBuf,
    elevations: Vec<f64>,
    charges: Vec<u32>,
    ranges: BTreeMap<u32, Vec<f64>>,
    has_wind_sensitivity: bool,
}

impl TableSet {
    /// Load and validate one `.npz` table file.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let meta = std::fs::metadata(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if meta.len() > MAX_TABLE_FILE_BYTES {
            return Err(TableError::TooLarge {
                path: path.to_path_buf(),
                size: meta.len(),
                max: MAX_TABLE_FILE_BYTES,
            });
        }
        let arrays = npy::read_npz(path).map_err(|source| TableError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_arrays(path.to_path_buf(), arrays)
    }

    /// Build a table from named arrays, checking that every listed charge has a
    /// range array as long as the elevation array.
    pub fn from_arrays(
        path: PathBuf,
        mut arrays: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, TableError> {
        let missing = |name: &str| TableError::MissingArray {
            path: path.clone(),
            name: name.to_string(),
        };
        let elevations = arrays
            .remove(ELEVATION_ARRAY)
            .ok_or_else(|| missing(ELEVATION_ARRAY))?;
        let raw_ids = arrays
            .remove(CHARGES_ARRAY)
            .ok_or_else(|| missing(CHARGES_ARRAY))?;

        let mut charges = Vec::with_capacity(raw_ids.len());
        for v in raw_ids {
            if !(v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64) {
                return Err(TableError::InvalidChargeId { path, value: v });
            }
            let c = v as u32;
            if charges.contains(&c) {
                return Err(TableError::DuplicateChargeId { path, charge: c });
            }
            charges.push(c);
        }

        let mut ranges = BTreeMap::new();
        for &c in &charges {
            let name = range_array(c);
            let r = arrays.remove(&name).ok_or_else(|| missing(&name))?;
            if r.len() != elevations.len() {
                return Err(TableError::LengthMismatch {
                    path,
                    name,
                    len: r.len(),
                    expected: elevations.len(),
                });
            }
            ranges.insert(c, r);
        }

        let has_wind_sensitivity = charges.first().is_some_and(|&c| {
            arrays.contains_key(&drift_sensitivity_array(c))
                && arrays.contains_key(&range_sensitivity_array(c))
        });

        Ok(Self {
            path,
            elevations,
            charges,
            ranges,
            has_wind_sensitivity,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn elevations(&self) -> &[f64] {
        &self.elevations
    }

    /// Charge ids in file order.
    pub fn charges(&self) -> &[u32] {
        &self.charges
    }

    pub fn ranges(&self, charge: u32) -> Option<&[f64]> {
        self.ranges.get(&charge).map(Vec::as_slice)
    }

    /// Whether the file carries drift/range wind-sensitivity arrays.
    pub fn has_wind_sensitivity(&self) -> bool {
        self.has_wind_sensitivity
    }

    /// Elevation whose tabulated range is nearest to `target_range` (first one on
    /// ties). `None` for an unknown charge or an empty table.
    pub fn guess_elevation(&self, charge: u32, target_range: f64) -> Option<f64> {
        let ranges = self.ranges.get(&charge)?;
        let mut best: Option<(usize, f64)> = None;
        for (i, r) in ranges.iter().enumerate() {
            let d = (r - target_range).abs();
            if best.map_or(!d.is_nan(), |(_, b)| d < b) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| self.elevations[i])
    }
}

/// The direct, low and high tables of one weapon/projectile.
#[derive(Debug, Clone, Default)]
pub struct TableManager {
    direct: Option<TableSet>,
    low: Option<TableSet>,
    high: Option<TableSet>,
    folder: Option<PathBuf>,
}

impl TableManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_folder(folder: &Path) -> Result<Self, TableError> {
        let mut tm = Self::new();
        tm.load_folder(folder)?;
        Ok(tm)
    }

    /// Manager over tables already in memory.
    pub fn from_sets(direct: TableSet, low: TableSet, high: TableSet) -> Self {
        Self {
            direct: Some(direct),
            low: Some(low),
            high: Some(high),
            folder: None,
        }
    }

    /// Load the three band tables from `folder`. On error the manager keeps
    /// whatever it held before.
    pub fn load_folder(&mut self, folder: &Path) -> Result<(), TableError> {
        let direct = TableSet::load(&folder.join(table_file(Band::Direct)))?;
        let low = TableSet::load(&folder.join(table_file(Band::Low)))?;
        let high = TableSet::load(&folder.join(table_file(Band::High)))?;
        tracing::info!(
            "loaded ballistic tables from {} ({} / {} / {} elevations)",
            folder.display(),
            direct.elevations.len(),
            low.elevations.len(),
            high.elevations.len()
        );
        self.direct = Some(direct);
        self.low = Some(low);
        self.high = Some(high);
        self.folder = Some(folder.to_path_buf());
        Ok(())
    }

    /// True once all three tables are present.
    pub fn loaded(&self) -> bool {
        self.direct.is_some() && self.low.is_some() && self.high.is_some()
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn set(&self, band: Band) -> Option<&TableSet> {
        match band {
            Band::Direct => self.direct.as_ref(),
            Band::Low => self.low.as_ref(),
            Band::High => self.high.as_ref(),
        }
    }

    /// Tables to search for a request, in search order.
    pub fn sets_for(&self, req: &SolveRequest) -> Vec<&TableSet> {
        Band::for_request(req)
            .iter()
            .filter_map(|&b| self.set(b))
            .collect()
    }
}
