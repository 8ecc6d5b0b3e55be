//! Rail infrastructure track dataset
//!
//! The dataset is a GeoJSON FeatureCollection in ETRS-TM35FIN meters. Each
//! feature becomes one [`RawTrack`]; reprojection and simplification are
//! left to [`rail_geometry::prepare_tracks`].

use crate::Result;
use geojson::{Feature, GeoJson, Position, Value};
use rail_geometry::{GeometryError, ProjectedPoint, RawTrack, Track, TrackAttributes, prepare_tracks};
use serde::Deserialize;
use std::ops::RangeInclusive;

/// Projected bounds of EPSG:3067, easting
pub const EXTENT_X: RangeInclusive<f64> = 43_547.79..=764_796.72;
/// Projected bounds of EPSG:3067, northing
pub const EXTENT_Y: RangeInclusive<f64> = 6_522_236.87..=7_795_461.19;

/// Attributes published with every track feature
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TrackProperties {
    /// Track identifier
    #[serde(default)]
    pub tunnus: Option<String>,
    /// Object identifier, used when `tunnus` is missing
    #[serde(default)]
    pub tunniste: Option<String>,
    /// Free-form description
    #[serde(default)]
    pub kuvaus: Option<String>,
    /// Electrified, `null` when unknown
    #[serde(default)]
    pub sahkoistetty: Option<bool>,
}

impl TrackProperties {
    /// Read the known attributes from a feature's property map
    pub fn from_feature(feature: &mut Feature) -> Result<Self> {
        match feature.properties.take() {
            Some(properties) => Ok(serde_json::from_value(serde_json::Value::Object(properties))?),
            None => Ok(Self::default()),
        }
    }

    fn into_attributes(self, index: usize) -> TrackAttributes {
        let id = self
            .tunnus
            .or(self.tunniste)
            .unwrap_or_else(|| format!("feature-{index}"));

        TrackAttributes {
            id,
            description: self.kuvaus,
            electrified: self.sahkoistetty.unwrap_or(false),
        }
    }
}

/// Check that a coordinate lies within the projected CRS extent
pub fn check_extent(point: ProjectedPoint) -> rail_geometry::Result<ProjectedPoint> {
    if EXTENT_X.contains(&point.x) && EXTENT_Y.contains(&point.y) {
        Ok(point)
    } else {
        Err(GeometryError::ProjectionOutOfDomain {
            x: point.x,
            y: point.y,
        })
    }
}

fn projected_line(positions: &[Position]) -> std::result::Result<Vec<ProjectedPoint>, String> {
    positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => check_extent(ProjectedPoint::new(*x, *y)).map_err(|e| e.to_string()),
            _ => Err(format!("position with {} coordinate(s)", position.len())),
        })
        .collect()
}

fn parse_lines(value: &Value) -> std::result::Result<Vec<Vec<ProjectedPoint>>, String> {
    match value {
        Value::MultiLineString(lines) => lines.iter().map(|line| projected_line(line)).collect(),
        Value::LineString(line) => Ok(vec![projected_line(line)?]),
        _ => Err("unsupported geometry type, expected LineString or MultiLineString".to_string()),
    }
}

/// Parse the track dataset into raw tracks
///
/// Features without usable geometry, with unreadable properties, or with any
/// coordinate outside the projected extent are logged and skipped. Only an
/// unreadable document is an error.
pub fn parse_track_dataset(json: &str) -> Result<Vec<RawTrack>> {
    let features = match json.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    };
    let total = features.len();

    let tracks: Vec<RawTrack> = features
        .into_iter()
        .enumerate()
        .filter_map(|(index, mut feature)| {
            let attributes = match TrackProperties::from_feature(&mut feature) {
                Ok(properties) => properties.into_attributes(index),
                Err(e) => {
                    tracing::warn!("Skipping feature {}: {}", index, e);
                    return None;
                }
            };
            let Some(geometry) = feature.geometry else {
                tracing::warn!("Skipping track {} without geometry", attributes.id);
                return None;
            };
            match parse_lines(&geometry.value) {
                Ok(lines) => Some(RawTrack { attributes, lines }),
                Err(e) => {
                    tracing::warn!("Skipping track {}: {}", attributes.id, e);
                    None
                }
            }
        })
        .collect();

    tracing::debug!("Parsed {} of {} track features", tracks.len(), total);
    Ok(tracks)
}

/// Parse and prepare a render-ready track snapshot
pub fn load_tracks(json: &str, tolerance_deg: f64, electrified_only: bool) -> Result<Vec<Track>> {
    let mut raw = parse_track_dataset(json)?;
    if electrified_only {
        raw.retain(|track| track.attributes.electrified);
    }
    Ok(prepare_tracks(raw, tolerance_deg))
}
