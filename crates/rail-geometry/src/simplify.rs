//! Polyline simplification for render-ready track geometry
//!
//! Tolerances are in geographic degrees, so simplification only makes sense
//! after reprojection.

use geo::{LineString, Simplify};

/// Fixed simplification tolerance in degrees
pub const SIMPLIFY_TOLERANCE_DEG: f64 = 0.0002;

/// Simplify a polyline with the Douglas-Peucker algorithm
///
/// The first and last points are always kept. Every discarded point lies
/// within `tolerance_deg` of the simplified chain. Lines with two or fewer
/// points are returned unchanged.
#[inline]
pub fn simplify(line: &LineString<f64>, tolerance_deg: f64) -> LineString<f64> {
    line.simplify(tolerance_deg)
}
