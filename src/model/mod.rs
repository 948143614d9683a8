//! Request and result values exchanged with the solvers.

use crate::ballistics::step_budget;
use crate::config::{DEFAULT_STEP_TIME_S, DEFAULT_TIME_TO_LIVE_S, DEFAULT_TOLERANCE_M};
use crate::config::MAX_STEP_BUDGET;
use crate::config::{DIRECT_FIRE_MAX_MIL, LOW_HIGH_SPLIT_MIL, MAX_ELEVATION_MIL};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Firing trajectory family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Arc {
    Low,
    High,
    Any,
}

/// Elevation band searched by the solvers; also names the matching range table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    Direct,
    Low,
    High,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Direct, Band::Low, Band::High];

    /// Inclusive elevation limits in mil.
    pub fn limits_mil(self) -> (f64, f64) {
        match self {
            Band::Direct => (0.0, DIRECT_FIRE_MAX_MIL),
            Band::Low => (0.0, LOW_HIGH_SPLIT_MIL),
            Band::High => (LOW_HIGH_SPLIT_MIL, MAX_ELEVATION_MIL),
        }
    }

    /// Bands admissible for a request, in search order.
    pub fn for_request(req: &SolveRequest) -> &'static [Band] {
        if req.direct_fire {
            return &[Band::Direct];
        }
        match req.arc {
            Arc::Low => &[Band::Low],
            Arc::High => &[Band::High],
            Arc::Any => &[Band::Low, Band::High],
        }
    }

    /// Elevations from the lower limit in `step_mil` increments, upper limit included
    /// when it falls on the grid.
    pub fn grid(self, step_mil: f64) -> Vec<f64> {
        let (lo, hi) = self.limits_mil();
        elevation_grid(lo, hi, step_mil)
    }
}

pub fn elevation_grid(lo: f64, hi: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || hi < lo {
        return Vec::new();
    }
    let n = ((hi - lo) / step + 1e-9).floor() as usize + 1;
    (0..n).map(|i| lo + i as f64 * step).collect()
}

/// Wind already rotated into the fire frame (m/s). No vertical component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindFireFrame {
    /// Along the gun-to-target line; positive is a tail wind.
    pub downrange: f64,
    /// Across the line of fire; positive pushes toward +drift.
    pub lateral: f64,
}

impl WindFireFrame {
    pub fn new(downrange: f64, lateral: f64) -> Self {
        Self { downrange, lateral }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("step_time must be positive, got {0}")]
    NonPositiveStep(f64),
    #[error("time_to_live {ttl} is shorter than step_time {step}")]
    TimeToLiveTooShort { ttl: f64, step: f64 },
    #[error("{0} is not finite")]
    NonFinite(&'static str),
    #[error("time_to_live / step_time needs {steps} steps (max {max})")]
    TooManySteps { steps: usize, max: usize },
}

/// One firing-solution query, expressed in the fire frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveRequest {
    /// Downrange distance to the target (m).
    pub target_range_m: f64,
    /// Target height minus gun height (m).
    pub target_alt_m: f64,
    /// Lateral offset of the target (m); normally 0.
    pub target_drift_m: f64,
    pub wind_fireframe: WindFireFrame,
    /// Ignored when `direct_fire` is set.
    pub arc: Arc,
    pub direct_fire: bool,
    pub tolerance_m: f64,
    pub step_time: f64,
    pub time_to_live: f64,
}

impl SolveRequest {
    /// Request for a target at `range_m` downrange and `alt_m` above the gun, with
    /// no wind, any arc and default integration settings.
    pub fn new(range_m: f64, alt_m: f64) -> Self {
        Self {
            target_range_m: range_m,
            target_alt_m: alt_m,
            target_drift_m: 0.0,
            wind_fireframe: WindFireFrame::default(),
            arc: Arc::Any,
            direct_fire: false,
            tolerance_m: DEFAULT_TOLERANCE_M,
            step_time: DEFAULT_STEP_TIME_S,
            time_to_live: DEFAULT_TIME_TO_LIVE_S,
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        let finite = [
            ("target_range_m", self.target_range_m),
            ("target_alt_m", self.target_alt_m),
            ("target_drift_m", self.target_drift_m),
            ("wind downrange", self.wind_fireframe.downrange),
            ("wind lateral", self.wind_fireframe.lateral),
            ("tolerance_m", self.tolerance_m),
            ("step_time", self.step_time),
            ("time_to_live", self.time_to_live),
        ];
        for (name, v) in finite {
            if !v.is_finite() {
                return Err(RequestError::NonFinite(name));
            }
        }
        if self.step_time <= 0.0 {
            return Err(RequestError::NonPositiveStep(self.step_time));
        }
        if self.time_to_live < self.step_time {
            return Err(RequestError::TimeToLiveTooShort {
                ttl: self.time_to_live,
                step: self.step_time,
            });
        }
        let steps = step_budget(self.time_to_live, self.step_time);
        if steps > MAX_STEP_BUDGET {
            return Err(RequestError::TooManySteps {
                steps,
                max: MAX_STEP_BUDGET,
            });
        }
        Ok(())
    }

    /// Target point in fire-frame coordinates: (downrange, altitude, drift).
    pub fn target_point(&self) -> [f64; 3] {
        [self.target_range_m, self.target_alt_m, self.target_drift_m]
    }
}

/// Outcome of evaluating one (charge, elevation) candidate.
/// Miss components are signed, computed minus target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotResult {
    pub charge: u32,
    pub elevation_mil: f64,
    pub muzzle_velocity: f64,
    pub time_of_flight: f64,
    pub miss_total_m: f64,
    pub miss_range_m: f64,
    pub miss_alt_m: f64,
    pub miss_drift_m: f64,
}

impl ShotResult {
    pub fn within(&self, tolerance_m: f64) -> bool {
        self.miss_total_m <= tolerance_m
    }
}
