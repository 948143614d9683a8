//! Text and JSON rendering of firing solutions.

use crate::model::{ShotResult, SolveRequest};
use crate::util::mil_to_deg;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// A solve outcome together with the request that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct SolutionReport {
    pub request: SolveRequest,
    /// Gun-to-target bearing when the target was given as map coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing_mil: Option<f64>,
    pub within_tolerance: bool,
    pub solution: Option<ShotResult>,
}

impl SolutionReport {
    pub fn new(
        request: SolveRequest,
        bearing_mil: Option<f64>,
        solution: Option<ShotResult>,
    ) -> Self {
        Self {
            within_tolerance: solution.is_some_and(|s| s.within(request.tolerance_m)),
            request,
            bearing_mil,
            solution,
        }
    }
}

pub fn solution_text(r: &ShotResult, bearing_mil: Option<f64>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Charge:       {}", r.charge);
    let _ = writeln!(
        out,
        "Elevation:    {:.1} mil ({:.2}°)",
        r.elevation_mil,
        mil_to_deg(r.elevation_mil)
    );
    if let Some(b) = bearing_mil {
        let _ = writeln!(out, "Bearing:      {:.1} mil", b);
    }
    let _ = writeln!(out, "Muzzle vel.:  {:.1} m/s", r.muzzle_velocity);
    let _ = writeln!(out, "Time of fl.:  {:.2} s", r.time_of_flight);
    let _ = write!(
        out,
        "Miss:         {:.2} m (range {:+.2}, alt {:+.2}, drift {:+.2})",
        r.miss_total_m, r.miss_range_m, r.miss_alt_m, r.miss_drift_m
    );
    out
}

pub fn solution_json(report: &SolutionReport) -> Result<String, String> {
    serde_json::to_string_pretty(report).map_err(|e| e.to_string())
}

pub fn write_json_report(report: &SolutionReport, path: &Path) -> Result<(), String> {
    let json = solution_json(report)?;
    fs::write(path, json).map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot() -> ShotResult {
        ShotResult {
            charge: 3,
            elevation_mil: 812.5,
            muzzle_velocity: 180.0,
            time_of_flight: 21.37,
            miss_total_m: 2.5,
            miss_range_m: -1.5,
            miss_alt_m: 2.0,
            miss_drift_m: 0.0,
        }
    }

    #[test]
    fn text_lists_fields() {
        let t = solution_text(&shot(), Some(1600.0));
        assert!(t.contains("Charge:       3"));
        assert!(t.contains("812.5 mil"));
        assert!(t.contains("Bearing:      1600.0 mil"));
        assert!(t.contains("range -1.50"));
        assert!(!solution_text(&shot(), None).contains("Bearing"));
    }

    #[test]
    fn json_echoes_request() {
        let report = SolutionReport::new(SolveRequest::new(1500.0, 10.0), None, Some(shot()));
        assert!(report.within_tolerance);
        let v: serde_json::Value = serde_json::from_str(&solution_json(&report).unwrap()).unwrap();
        assert_eq!(v["request"]["target_range_m"], 1500.0);
        assert_eq!(v["request"]["arc"], "ANY");
        assert_eq!(v["solution"]["charge"], 3);
        assert!(v.get("bearing_mil").is_none());
    }

    #[test]
    fn json_report_written_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("solution.json");
        let report = SolutionReport::new(SolveRequest::new(900.0, 0.0), Some(10.0), None);
        write_json_report(&report, &path).unwrap();
        let s = fs::read_to_string(&path).unwrap();
        assert!(s.contains("\"solution\": null"));
        assert!(s.contains("\"within_tolerance\": false"));
    }
}
