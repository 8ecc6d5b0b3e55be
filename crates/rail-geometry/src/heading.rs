//! Direction of travel between consecutive snapped positions

use crate::{GeometryError, Result};
use geo::{Bearing, Distance, Haversine, Point};
use std::fmt;

/// Points closer than this (meters) are treated as coincident
const COINCIDENT_EPSILON_M: f64 = 1e-6;

/// Clockwise angle from true north in degrees, always within [0, 360)
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Heading(f64);

impl Heading {
    pub const NORTH: Heading = Heading(0.0);

    /// Normalize any angle in degrees into [0, 360)
    pub fn new(degrees: f64) -> Self {
        let normalized = degrees.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs
        if normalized >= 360.0 {
            Self(0.0)
        } else {
            Self(normalized)
        }
    }

    #[inline]
    pub fn degrees(self) -> f64 {
        self.0
    }

    /// Rotate clockwise by `degrees`
    #[inline]
    pub fn offset(self, degrees: f64) -> Self {
        Self::new(self.0 + degrees)
    }

    /// The opposite direction
    #[inline]
    pub fn reversed(self) -> Self {
        self.offset(180.0)
    }
}

impl From<Heading> for f64 {
    #[inline]
    fn from(heading: Heading) -> Self {
        heading.0
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°", self.0)
    }
}

/// Initial great-circle bearing from `from` to `to`
///
/// # Returns
/// The heading, or `DegenerateHeading` when the points coincide. Callers
/// keep their previously known heading in that case instead of resetting
/// to north.
pub fn heading(from: Point<f64>, to: Point<f64>) -> Result<Heading> {
    if Haversine.distance(from, to) < COINCIDENT_EPSILON_M {
        return Err(GeometryError::DegenerateHeading);
    }
    Ok(Heading::new(Haversine.bearing(from, to)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinal_directions() {
        let origin = Point::new(24.0, 61.0);

        let north = heading(origin, Point::new(24.0, 61.1)).unwrap();
        assert!(north.degrees() < 1e-9 || north.degrees() > 360.0 - 1e-9);

        let east = heading(origin, Point::new(24.001, 61.0)).unwrap();
        assert!((east.degrees() - 90.0).abs() < 0.01);

        let south = heading(origin, Point::new(24.0, 60.9)).unwrap();
        assert!((south.degrees() - 180.0).abs() < 1e-9);

        let west = heading(origin, Point::new(23.999, 61.0)).unwrap();
        assert!((west.degrees() - 270.0).abs() < 0.01);
    }

    #[test]
    fn test_reverse_differs_by_half_turn() {
        let pairs = [
            (Point::new(24.0, 61.0), Point::new(24.01, 61.02)),
            (Point::new(25.5, 60.2), Point::new(25.49, 60.1)),
            (Point::new(22.3, 63.8), Point::new(22.31, 63.8)),
        ];

        for (a, b) in pairs {
            let forward = heading(a, b).unwrap();
            let backward = heading(b, a).unwrap();
            let delta = (forward.degrees() - backward.degrees()).rem_euclid(360.0);
            assert!((delta - 180.0).abs() < 0.05, "delta {delta}");
        }
    }

    #[test]
    fn test_coincident_points_are_degenerate() {
        let a = Point::new(24.0, 61.0);
        assert_eq!(heading(a, a).unwrap_err(), GeometryError::DegenerateHeading);
    }

    #[test]
    fn test_normalization() {
        assert_eq!(Heading::new(-90.0).degrees(), 270.0);
        assert_eq!(Heading::new(360.0).degrees(), 0.0);
        assert_eq!(Heading::new(725.0).degrees(), 5.0);
        assert!(Heading::new(-1e-20).degrees() < 360.0);
        assert_eq!(Heading::new(350.0).reversed().degrees(), 170.0);
        assert_eq!(Heading::new(10.0).offset(-20.0).degrees(), 350.0);
    }
}
