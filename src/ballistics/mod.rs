//! Point-mass trajectory integrator: fixed-step RK4 under gravity and wind-relative quadratic drag.
//!
//! Frame: x downrange, y altitude (gravity along -y), z drift. The gun sits at the origin.

mod evaluate;

pub use evaluate::{closest_approach, impact_point, impact_range, Approach, Impact, ImpactPoint};

use crate::config::{G, MAX_STEP_BUDGET};
use crate::model::WindFireFrame;

/// Guards direction normalisation when the air-relative speed is exactly zero.
const VREL_EPS: f64 = 1e-9;

/// Samples before which the ground stop rule is not applied; flat shots start
/// at y = 0 and can dip below it within the first steps.
const GROUND_STOP_MIN_STEP: usize = 5;

/// Samples reserved up front; ground-stopped runs rarely need more.
const PREALLOC_SAMPLES: usize = 4096;

/// Initial conditions and integration settings for one shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchParams {
    pub v0: f64,
    pub elevation_rad: f64,
    pub mass_kg: f64,
    pub drag_coeff: f64,
    pub wind: WindFireFrame,
    pub step_time: f64,
    pub time_to_live: f64,
    pub stop_on_ground: bool,
}

/// Time-ordered samples of one integration run. Index 0 is the launch point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pub t: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl Trajectory {
    fn with_capacity(n: usize) -> Self {
        Self {
            t: Vec::with_capacity(n),
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, t: f64, s: &State) {
        self.t.push(t);
        self.x.push(s[0]);
        self.y.push(s[1]);
        self.z.push(s[2]);
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Time of the last recorded sample.
    pub fn time_of_flight(&self) -> f64 {
        self.t.last().copied().unwrap_or(0.0)
    }
}

/// [x, y, z, vx, vy, vz]
type State = [f64; 6];

fn derivative(s: &State, wind: &[f64; 3], k: f64) -> State {
    let (vx, vy, vz) = (s[3], s[4], s[5]);
    let rvx = vx - wind[0];
    let rvy = vy - wind[1];
    let rvz = vz - wind[2];
    let vrel = (rvx * rvx + rvy * rvy + rvz * rvz).sqrt() + VREL_EPS;
    [
        vx,
        vy,
        vz,
        -k * vrel * rvx,
        -G - k * vrel * rvy,
        -k * vrel * rvz,
    ]
}

fn offset(s: &State, d: &State, h: f64) -> State {
    let mut out = *s;
    for (o, di) in out.iter_mut().zip(d) {
        *o += h * di;
    }
    out
}

fn rk4_step(s: &State, dt: f64, wind: &[f64; 3], k: f64) -> State {
    let k1 = derivative(s, wind, k);
    let k2 = derivative(&offset(s, &k1, 0.5 * dt), wind, k);
    let k3 = derivative(&offset(s, &k2, 0.5 * dt), wind, k);
    let k4 = derivative(&offset(s, &k3, dt), wind, k);
    let mut next = *s;
    for i in 0..6 {
        next[i] += dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
    }
    next
}

/// Number of integration steps for a flight budget: ceil(ttl / dt), at least 1.
pub fn step_budget(time_to_live: f64, step_time: f64) -> usize {
    let n = (time_to_live / step_time).ceil();
    if n.is_finite() && n >= 1.0 {
        n as usize
    } else {
        1
    }
}

/// Integrate one shot.
///
/// With `stop_on_ground`, the run ends at the first sample past step 5 that is
/// below zero altitude and still descending; that sample is kept as-is (no
/// interpolation, use [`impact_range`] for the crossing point). Otherwise the
/// run covers the whole step budget, capped at [`MAX_STEP_BUDGET`].
pub fn simulate(p: &LaunchParams) -> Trajectory {
    let dt = p.step_time;
    let k = p.drag_coeff / p.mass_kg;
    let wind = [p.wind.downrange, 0.0, p.wind.lateral];
    let mut s: State = [
        0.0,
        0.0,
        0.0,
        p.v0 * p.elevation_rad.cos(),
        p.v0 * p.elevation_rad.sin(),
        0.0,
    ];

    let nmax = step_budget(p.time_to_live, dt).min(MAX_STEP_BUDGET);
    let mut tr = Trajectory::with_capacity(nmax.min(PREALLOC_SAMPLES) + 1);
    tr.push(0.0, &s);

    let mut last_y = 0.0;
    for i in 1..=nmax {
        s = rk4_step(&s, dt, &wind, k);
        tr.push(i as f64 * dt, &s);
        let y = s[1];
        if p.stop_on_ground && i > GROUND_STOP_MIN_STEP && y < 0.0 && y < last_y {
            break;
        }
        last_y = y;
    }
    tr
}
