//! Map geometry: grid-coordinate parsing, gun-to-target distance and bearing,
//! and wind decomposition into the fire frame.

use crate::model::WindFireFrame;
use thiserror::Error;

/// Scale for 4-digit grid coordinates (10 m squares).
pub const AUTO_SCALE_4DIG: f64 = 10.0;
pub const AUTO_SCALE_5DIG: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    #[error("empty coordinate")]
    Empty,
    #[error("coordinate must be digits, got {0:?}")]
    NotDigits(String),
}

/// World position in metres; x east, y north.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Normalise a typed coordinate to its digit string. Accepts blanks and
/// underscores as separators, an optional `x`/`y` axis prefix and a leading `+`.
pub fn parse_coord_digits(s: &str) -> Result<String, CoordError> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '_')
        .collect();
    if cleaned.is_empty() {
        return Err(CoordError::Empty);
    }
    let mut rest = cleaned.as_str();
    if rest.len() >= 2 && rest.starts_with(|c: char| matches!(c, 'x' | 'X' | 'y' | 'Y')) {
        rest = &rest[1..];
    }
    rest = rest.strip_prefix('+').unwrap_or(rest);
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoordError::NotDigits(rest.to_string()));
    }
    Ok(rest.to_string())
}

/// Parse a grid coordinate into metres. `scale_override` wins; otherwise four
/// digits are tens of metres and anything else is metres.
pub fn parse_coord_with_autoscale(s: &str, scale_override: Option<f64>) -> Result<f64, CoordError> {
    let digits = parse_coord_digits(s)?;
    let n: f64 = digits
        .parse()
        .map_err(|_| CoordError::NotDigits(digits.clone()))?;
    let scale = match (scale_override, digits.len()) {
        (Some(s), _) => s,
        (None, 4) => AUTO_SCALE_4DIG,
        (None, 5) => AUTO_SCALE_5DIG,
        _ => 1.0,
    };
    Ok(n * scale)
}

pub fn distance_2d(a: Point2D, b: Point2D) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Bearing from `a` to `b`, clockwise from north, in (-π, π].
pub fn bearing_rad_from_north(a: Point2D, b: Point2D) -> f64 {
    (b.x - a.x).atan2(b.y - a.y)
}

/// World (east, north) components of a wind blowing *from* `from_deg`.
pub fn wind_components_from_speed_dir(speed_mps: f64, from_deg: f64) -> (f64, f64) {
    let toward = ((from_deg + 180.0) % 360.0).to_radians();
    (speed_mps * toward.sin(), speed_mps * toward.cos())
}

/// Project a world wind onto the line of fire (`bearing_rad` from north) and its
/// right-hand normal.
pub fn rotate_world_to_fireframe(wx: f64, wy: f64, bearing_rad: f64) -> WindFireFrame {
    let (s, c) = bearing_rad.sin_cos();
    WindFireFrame {
        downrange: wx * s + wy * c,
        lateral: wx * c - wy * s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn coord_digits_strip_prefix_and_separators() {
        assert_eq!(parse_coord_digits(" x 01_234 ").unwrap(), "01234");
        assert_eq!(parse_coord_digits("+0456").unwrap(), "0456");
        assert_eq!(parse_coord_digits("Y+12").unwrap(), "12");
        assert_eq!(parse_coord_digits("7").unwrap(), "7");
        assert_eq!(parse_coord_digits("   "), Err(CoordError::Empty));
        assert!(matches!(
            parse_coord_digits("12a4"),
            Err(CoordError::NotDigits(_))
        ));
        assert!(parse_coord_digits("x").is_err());
    }

    #[test]
    fn autoscale_by_digit_count() {
        assert_eq!(parse_coord_with_autoscale("0123", None).unwrap(), 1230.0);
        assert_eq!(parse_coord_with_autoscale("01234", None).unwrap(), 1234.0);
        assert_eq!(parse_coord_with_autoscale("123", None).unwrap(), 123.0);
        assert_eq!(parse_coord_with_autoscale("0123", Some(100.0)).unwrap(), 12300.0);
    }

    #[test]
    fn distance_and_bearing() {
        let gun = Point2D::new(100.0, 100.0);
        assert!((distance_2d(gun, Point2D::new(400.0, 500.0)) - 500.0).abs() < 1e-12);
        assert!(bearing_rad_from_north(gun, Point2D::new(100.0, 900.0)).abs() < 1e-12);
        let east = bearing_rad_from_north(gun, Point2D::new(900.0, 100.0));
        assert!((east - FRAC_PI_2).abs() < 1e-12);
        assert!((bearing_rad_from_north(gun, Point2D::new(100.0, 0.0)) - PI).abs() < 1e-12);
    }

    #[test]
    fn wind_from_north_blows_south() {
        let (wx, wy) = wind_components_from_speed_dir(4.0, 0.0);
        assert!(wx.abs() < 1e-12);
        assert!((wy + 4.0).abs() < 1e-12);
        let (wx, wy) = wind_components_from_speed_dir(2.0, 270.0);
        assert!((wx - 2.0).abs() < 1e-12);
        assert!(wy.abs() < 1e-12);
    }

    #[test]
    fn fire_frame_rotation() {
        // Firing east with a wind toward the east is a pure tail wind.
        let ff = rotate_world_to_fireframe(3.0, 0.0, FRAC_PI_2);
        assert!((ff.downrange - 3.0).abs() < 1e-12);
        assert!(ff.lateral.abs() < 1e-12);
        // Firing north, a wind toward the east is lateral and positive.
        let ff = rotate_world_to_fireframe(3.0, 0.0, 0.0);
        assert!(ff.downrange.abs() < 1e-12);
        assert!((ff.lateral - 3.0).abs() < 1e-12);
        // Head wind.
        let (wx, wy) = wind_components_from_speed_dir(5.0, 0.0);
        let ff = rotate_world_to_fireframe(wx, wy, 0.0);
        assert!((ff.downrange + 5.0).abs() < 1e-12);
    }
}
