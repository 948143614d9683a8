//! Read-only analyses of a computed trajectory.

use super::Trajectory;

/// Sample of a trajectory nearest to a target point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Approach {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub miss: f64,
}

/// Ground crossing of a trajectory: (range, time).
pub type Impact = (f64, f64);

/// Closest recorded sample to `target` = (x, y, z). Ties go to the earliest
/// sample. Returns `None` for an empty trajectory.
pub fn closest_approach(tr: &Trajectory, target: [f64; 3]) -> Option<Approach> {
    let [tx, ty, tz] = target;
    let mut best: Option<(usize, f64)> = None;
    for i in 0..tr.len() {
        let dx = tr.x[i] - tx;
        let dy = tr.y[i] - ty;
        let dz = tr.z[i] - tz;
        let d2 = dx * dx + dy * dy + dz * dz;
        if best.map_or(true, |(_, b)| d2 < b) {
            best = Some((i, d2));
        }
    }
    best.map(|(index, d2)| Approach {
        index,
        x: tr.x[index],
        y: tr.y[index],
        z: tr.z[index],
        miss: d2.sqrt(),
    })
}

/// Where a trajectory meets the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactPoint {
    pub range: f64,
    pub drift: f64,
    pub time: f64,
}

/// Range and time where the trajectory first crosses altitude zero going
/// down, linearly interpolated between the bracketing samples. A trajectory
/// that never comes down reports its last sample.
pub fn impact_range(tr: &Trajectory) -> Impact {
    let p = impact_point(tr);
    (p.range, p.time)
}

/// Like [`impact_range`], also interpolating drift at the crossing.
pub fn impact_point(tr: &Trajectory) -> ImpactPoint {
    let n = tr.len();
    let last = |v: &[f64]| v.last().copied().unwrap_or(0.0);
    if n < 2 {
        return ImpactPoint {
            range: last(&tr.x),
            drift: last(&tr.z),
            time: last(&tr.t),
        };
    }
    let crossing = (1..n).find(|&i| tr.y[i] <= 0.0 && tr.y[i - 1] > 0.0);
    let Some(i) = crossing else {
        return ImpactPoint {
            range: tr.x[n - 1],
            drift: tr.z[n - 1],
            time: tr.t[n - 1],
        };
    };
    let (y0, y1) = (tr.y[i - 1], tr.y[i]);
    let dy = y1 - y0;
    let a = if dy != 0.0 { (0.0 - y0) / dy } else { 0.0 };
    let lerp = |v: &[f64]| v[i - 1] + a * (v[i] - v[i - 1]);
    ImpactPoint {
        range: lerp(&tr.x),
        drift: lerp(&tr.z),
        time: lerp(&tr.t),
    }
}
