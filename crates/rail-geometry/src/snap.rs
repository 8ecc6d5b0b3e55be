//! Nearest on-track point search
//!
//! Snapping scans every segment of every line of every supplied track, so
//! the cost is linear in the total segment count. It is meant for on-demand
//! queries (a user selecting a train), not per-frame polling of a fleet.

use crate::{GeometryError, Result, Track};
use chrono::{DateTime, Utc};
use geo::{Coord, Distance, Haversine, Point};

/// A later candidate must be closer by more than this to replace the best
/// one, so equidistant candidates resolve to the first encountered.
const TIE_EPSILON_KM: f64 = 1e-12;

/// A single reported vehicle position
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleFix {
    /// Reported WGS84 position
    pub point: Point<f64>,
    /// Report time
    pub timestamp: DateTime<Utc>,
    /// Reported speed in km/h
    pub speed_kmh: Option<f64>,
}

/// The nearest on-track point for a query
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnappedFix {
    /// Point lying on the source segment
    pub point: Point<f64>,
    /// Index of the track in the queried slice
    pub track_index: usize,
    /// Index of the line within the track
    pub line_index: usize,
    /// Index of the segment within the line
    pub segment_index: usize,
    /// Great-circle distance from the query in kilometers
    pub distance_km: f64,
}

/// Find the closest point on any track to `query`
///
/// Ties are broken by iteration order: track, then line, then segment; the
/// first candidate encountered wins.
///
/// # Returns
/// The snapped fix, or `EmptyTrackSet` when the tracks hold no lines
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn snap(tracks: &[Track], query: Point<f64>) -> Result<SnappedFix> {
    let cos_lat = query.y().to_radians().cos();
    let mut best: Option<SnappedFix> = None;

    for (track_index, track) in tracks.iter().enumerate() {
        for (line_index, line) in track.lines().0.iter().enumerate() {
            for (segment_index, segment) in line.lines().enumerate() {
                let point = project_onto_segment(query.0, segment.start, segment.end, cos_lat);
                let distance_km = Haversine.distance(query, point) / 1000.0;

                if best
                    .as_ref()
                    .is_none_or(|b| distance_km + TIE_EPSILON_KM < b.distance_km)
                {
                    best = Some(SnappedFix {
                        point,
                        track_index,
                        line_index,
                        segment_index,
                        distance_km,
                    });
                }
            }
        }
    }

    best.ok_or(GeometryError::EmptyTrackSet)
}

/// Snap a vehicle fix, see [`snap`]
#[inline]
pub fn snap_fix(tracks: &[Track], fix: &VehicleFix) -> Result<SnappedFix> {
    snap(tracks, fix.point)
}

/// Snap `query`, falling back to the raw point when there is nothing to snap to
pub fn snap_or_raw(tracks: &[Track], query: Point<f64>) -> Point<f64> {
    match snap(tracks, query) {
        Ok(snapped) => snapped.point,
        Err(e) => {
            tracing::debug!("Using raw point {:?}: {}", query.x_y(), e);
            query
        }
    }
}

/// Perpendicular projection of `p` onto segment `a`-`b`, clamped to the ends
///
/// The projection parameter is solved in a local equirectangular frame and
/// the result interpolated in degrees, so it lies exactly on the segment.
fn project_onto_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>, cos_lat: f64) -> Point<f64> {
    let dx = (b.x - a.x) * cos_lat;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return Point(a);
    }

    let t = (((p.x - a.x) * cos_lat) * dx + (p.y - a.y) * dy) / len_sq;
    if t <= 0.0 {
        Point(a)
    } else if t >= 1.0 {
        Point(b)
    } else {
        Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y))
    }
}
