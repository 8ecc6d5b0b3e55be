//! Track storage and preparation module
//!
//! This module provides the `Track` struct holding render-ready geographic
//! geometry with precomputed metadata, and the pipeline that turns raw
//! projected survey geometry into tracks.

use crate::projection::{ProjectedPoint, reproject_line};
use crate::simplify::simplify;
use crate::{GeometryError, Result};
use geo::{BoundingRect, Distance, Haversine, LineString, MultiLineString, Point, Rect};
use rayon::prelude::*;

/// Descriptive attributes of a physical track
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackAttributes {
    /// Track identifier
    pub id: String,
    /// Free-form description
    pub description: Option<String>,
    /// Whether the track is electrified
    pub electrified: bool,
}

/// Track geometry as published, before reprojection
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawTrack {
    pub attributes: TrackAttributes,
    /// Multi-line geometry in the source projected CRS
    pub lines: Vec<Vec<ProjectedPoint>>,
}

/// A single physical track with geographic geometry and precomputed metadata
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    attributes: TrackAttributes,
    /// WGS84 geometry, every line has at least two points
    lines: MultiLineString<f64>,
    /// Cached total number of points (computed once during construction)
    cached_total_points: usize,
    /// Cached total length in meters (computed once during construction)
    cached_total_length: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Track {
    /// Create a track from geographic geometry
    ///
    /// # Returns
    /// The track, or `MalformedGeometry` if any line has fewer than two points
    pub fn new(attributes: TrackAttributes, lines: MultiLineString<f64>) -> Result<Self> {
        if let Some(line) = lines.0.iter().find(|line| line.0.len() < 2) {
            return Err(GeometryError::MalformedGeometry {
                points: line.0.len(),
            });
        }

        let cached_total_points = lines.0.iter().map(|line| line.0.len()).sum();
        let cached_total_length = lines.0.iter().map(haversine_length).sum();

        Ok(Self {
            attributes,
            lines,
            cached_total_points,
            cached_total_length,
        })
    }

    /// Reproject and simplify raw projected geometry into a track
    ///
    /// Every point is reprojected before simplification. Lines with fewer
    /// than two points are dropped with a warning; the track itself is only
    /// rejected when no line survives.
    pub fn from_raw(raw: RawTrack, tolerance_deg: f64) -> Result<Self> {
        let mut lines = Vec::with_capacity(raw.lines.len());
        let mut last_malformed = None;

        for points in &raw.lines {
            if points.len() < 2 {
                tracing::warn!(
                    "Dropping line with {} point(s) from track {}",
                    points.len(),
                    raw.attributes.id
                );
                last_malformed = Some(points.len());
                continue;
            }
            lines.push(simplify(&reproject_line(points), tolerance_deg));
        }

        match (lines.is_empty(), last_malformed) {
            (true, Some(points)) => Err(GeometryError::MalformedGeometry { points }),
            _ => Self::new(raw.attributes, MultiLineString::new(lines)),
        }
    }

    #[inline]
    pub fn attributes(&self) -> &TrackAttributes {
        &self.attributes
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.attributes.id
    }

    /// Access the geographic geometry
    #[inline]
    pub fn lines(&self) -> &MultiLineString<f64> {
        &self.lines
    }

    /// Get total number of points across all lines
    ///
    /// This is O(1) as the value is cached during construction.
    #[inline]
    pub fn total_points(&self) -> usize {
        self.cached_total_points
    }

    /// Total haversine length across all lines in meters
    ///
    /// This is O(1) as the value is cached during construction.
    #[inline]
    pub fn total_length(&self) -> f64 {
        self.cached_total_length
    }

    /// Bounding box in WGS84 degrees, `None` for a track without lines
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        self.lines.bounding_rect()
    }
}

/// Reproject and simplify a whole dataset in parallel
///
/// Output order follows input order. Tracks whose geometry is entirely
/// malformed are dropped with a warning so one bad feature never blocks the
/// rest of the snapshot.
pub fn prepare_tracks(raw: Vec<RawTrack>, tolerance_deg: f64) -> Vec<Track> {
    #[cfg(feature = "profiling")]
    profiling::scope!("track::prepare_tracks");

    let input_count = raw.len();
    let tracks: Vec<Track> = raw
        .into_par_iter()
        .filter_map(|raw| {
            let id = raw.attributes.id.clone();
            match Track::from_raw(raw, tolerance_deg) {
                Ok(track) => Some(track),
                Err(e) => {
                    tracing::warn!("Skipping track {}: {}", id, e);
                    None
                }
            }
        })
        .collect();

    tracing::debug!(
        "Prepared {} of {} tracks ({} points after simplification)",
        tracks.len(),
        input_count,
        tracks.iter().map(Track::total_points).sum::<usize>()
    );
    tracks
}

fn haversine_length(line: &LineString<f64>) -> f64 {
    line.lines()
        .map(|segment| Haversine.distance(Point::from(segment.start), Point::from(segment.end)))
        .sum()
}
