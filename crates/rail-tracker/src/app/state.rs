//! Tracker state management
//!
//! A single [`Tracker`] owns everything derived from the feeds: the current
//! track snapshot, the category map, the composition cache and the latest
//! state of every train seen. Messages are applied one at a time by the
//! owner, so no locking is involved.

use crate::feed::TrainKey;
use crate::feed::composition::{Amenities, Composition, CompositionCache};
use crate::feed::location::TrainLocation;
use crate::feed::metadata::{CategoryMap, TrainCategory};
use chrono::{DateTime, Utc};
use geo::Point;
use rail_geometry::{
    ConsistLayout, GeometryError, Heading, LayoutParams, SnappedFix, Track, VehicleFix,
    VehicleRole, heading, layout, snap_fix,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Which trains to render
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CategoryFilter {
    #[default]
    All,
    Commuter,
    LongDistance,
    Other,
}

impl CategoryFilter {
    pub fn matches(self, category: TrainCategory) -> bool {
        match self {
            Self::All => true,
            Self::Commuter => category == TrainCategory::Commuter,
            Self::LongDistance => category == TrainCategory::LongDistance,
            Self::Other => category == TrainCategory::Other,
        }
    }
}

/// Latest known state of one train
#[derive(Clone, Debug)]
pub struct TrainState {
    /// Last accepted fix as reported
    pub fix: VehicleFix,
    /// Snap result of the last fix, `None` when no track was available
    pub snapped: Option<SnappedFix>,
    /// Last defined heading, kept across stationary fixes
    pub heading: Option<Heading>,
}

impl TrainState {
    /// Snapped point, or the raw fix when snapping was not possible
    #[inline]
    pub fn position(&self) -> Point<f64> {
        self.snapped.map_or(self.fix.point, |s| s.point)
    }
}

/// Everything needed to draw one train
#[derive(Clone, Debug)]
pub struct RenderState {
    pub key: TrainKey,
    pub category: TrainCategory,
    pub point: Point<f64>,
    pub snapped: bool,
    pub heading: Option<Heading>,
    pub speed_kmh: Option<f64>,
    pub timestamp: DateTime<Utc>,
    /// `None` when no composition is known
    pub amenities: Option<Amenities>,
    /// Vehicle footprints, empty while the heading is unknown
    pub consist: ConsistLayout,
    /// Role of each footprint in `consist`
    pub roles: Vec<VehicleRole>,
}

/// Per-train state on top of a shared track snapshot
pub struct Tracker {
    tracks: Arc<[Track]>,
    categories: CategoryMap,
    compositions: CompositionCache,
    params: LayoutParams,
    trains: HashMap<TrainKey, TrainState>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Tracker {
    pub fn new(tracks: Arc<[Track]>, params: LayoutParams, composition_capacity: usize) -> Self {
        Self {
            tracks,
            categories: CategoryMap::default(),
            compositions: CompositionCache::new(composition_capacity),
            params,
            trains: HashMap::new(),
        }
    }

    /// Replace the track snapshot used for subsequent fixes
    pub fn set_tracks(&mut self, tracks: Arc<[Track]>) {
        tracing::debug!("Tracker switched to a snapshot of {} tracks", tracks.len());
        self.tracks = tracks;
    }

    #[inline]
    pub fn tracks(&self) -> &Arc<[Track]> {
        &self.tracks
    }

    pub fn set_categories(&mut self, categories: CategoryMap) {
        self.categories = categories;
    }

    pub fn add_compositions(&mut self, compositions: impl IntoIterator<Item = Composition>) {
        for composition in compositions {
            self.compositions.insert(composition);
        }
    }

    #[inline]
    pub fn train(&self, key: &TrainKey) -> Option<&TrainState> {
        self.trains.get(key)
    }

    #[inline]
    pub fn train_count(&self) -> usize {
        self.trains.len()
    }

    /// Apply one location message
    ///
    /// Reports older than the last accepted one for the same train are
    /// ignored. The heading is taken from the previous position to the new
    /// one; when the train has not moved the previous heading is kept.
    ///
    /// # Returns
    /// The key of the train, or `None` if the report was out of order
    pub fn ingest(&mut self, location: &TrainLocation) -> Option<TrainKey> {
        let key = location.key();
        let fix = location.to_fix();

        let snapped = match snap_fix(&self.tracks, &fix) {
            Ok(snapped) => Some(snapped),
            Err(e) => {
                tracing::warn!("Train {} left unsnapped: {}", key, e);
                None
            }
        };
        let position = snapped.map_or(fix.point, |s| s.point);

        match self.trains.get_mut(&key) {
            Some(state) if fix.timestamp < state.fix.timestamp => {
                tracing::debug!(
                    "Ignoring out-of-order report for train {} ({} < {})",
                    key,
                    fix.timestamp,
                    state.fix.timestamp
                );
                return None;
            }
            Some(state) => {
                match heading(state.position(), position) {
                    Ok(h) => state.heading = Some(h),
                    Err(GeometryError::DegenerateHeading) => {
                        tracing::debug!("Train {} stationary, keeping previous heading", key);
                    }
                    Err(e) => tracing::warn!("Heading for train {} failed: {}", key, e),
                }
                state.fix = fix;
                state.snapped = snapped;
            }
            None => {
                self.trains.insert(
                    key.clone(),
                    TrainState {
                        fix,
                        snapped,
                        heading: None,
                    },
                );
            }
        }

        Some(key)
    }

    /// Compute the render state of one train
    pub fn render_state(&mut self, key: &TrainKey) -> Option<RenderState> {
        let state = self.trains.get(key)?;
        let composition = self.compositions.get(key);

        let point = state.position();
        let (consist, roles) = match (state.heading, &composition) {
            (Some(h), Some(composition)) => {
                let vehicles = composition.vehicle_specs();
                let roles = vehicles.iter().map(|v| v.role).collect();
                (
                    layout(point, h, &vehicles, &self.params, &self.tracks),
                    roles,
                )
            }
            _ => (ConsistLayout::default(), Vec::new()),
        };

        Some(RenderState {
            key: key.clone(),
            category: self.categories.get(key),
            point,
            snapped: state.snapped.is_some(),
            heading: state.heading,
            speed_kmh: state.fix.speed_kmh,
            timestamp: state.fix.timestamp,
            amenities: composition.map(|c| c.amenities()),
            consist,
            roles,
        })
    }

    /// Render states of every train passing `filter`, ordered by key
    pub fn render_all(&mut self, filter: CategoryFilter) -> Vec<RenderState> {
        let mut keys: Vec<TrainKey> = self
            .trains
            .keys()
            .filter(|key| filter.matches(self.categories.get(key)))
            .cloned()
            .collect();
        keys.sort();

        keys.iter().filter_map(|key| self.render_state(key)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::composition::parse_compositions;
    use crate::feed::location::parse_message;
    use crate::feed::metadata::parse_metadata;
    use geo::{MultiLineString, line_string};
    use rail_geometry::TrackAttributes;

    fn tracks() -> Arc<[Track]> {
        let track = Track::new(
            TrackAttributes {
                id: "north-south".to_string(),
                ..Default::default()
            },
            MultiLineString::new(vec![line_string![(x: 24.0, y: 60.9), (x: 24.0, y: 61.1)]]),
        )
        .unwrap();
        vec![track].into()
    }

    fn message(number: u32, timestamp: &str, lon: f64, lat: f64) -> TrainLocation {
        parse_message(&format!(
            r#"{{"trainNumber":{number},"departureDate":"2025-05-20","timestamp":"{timestamp}","location":{{"type":"Point","coordinates":[{lon},{lat}]}},"speed":60}}"#
        ))
        .unwrap()
    }

    fn composition(number: u32) -> Composition {
        let json = format!(
            r#"[{{"trainNumber":{number},"departureDate":"2025-05-20","journeySections":[{{
                "locomotives":[{{"location":1,"locomotiveType":"Sr2","powerType":"Electric"}}],
                "wagons":[{{"location":2,"length":26400,"catering":true}},{{"location":3,"length":26400}}]
            }}]}}]"#
        );
        parse_compositions(&json).unwrap().remove(0)
    }

    #[test]
    fn test_first_fix_has_no_heading() {
        let mut tracker = Tracker::new(tracks(), LayoutParams::default(), 8);
        let key = tracker
            .ingest(&message(8, "2025-05-20T10:00:00Z", 24.001, 61.0))
            .unwrap();

        let state = tracker.train(&key).unwrap();
        assert!(state.heading.is_none());
        // Snapped onto the meridian track
        assert!((state.position().x() - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_heading_follows_movement() {
        let mut tracker = Tracker::new(tracks(), LayoutParams::default(), 8);
        tracker.ingest(&message(8, "2025-05-20T10:00:00Z", 24.0, 61.0));
        let key = tracker
            .ingest(&message(8, "2025-05-20T10:00:10Z", 24.0, 61.001))
            .unwrap();

        let h = tracker.train(&key).unwrap().heading.unwrap();
        assert!(h.degrees() < 1e-6 || h.degrees() > 360.0 - 1e-6);
    }

    #[test]
    fn test_stationary_fix_keeps_heading() {
        let mut tracker = Tracker::new(tracks(), LayoutParams::default(), 8);
        tracker.ingest(&message(8, "2025-05-20T10:00:00Z", 24.0, 61.001));
        tracker.ingest(&message(8, "2025-05-20T10:00:10Z", 24.0, 61.0));
        let key = tracker
            .ingest(&message(8, "2025-05-20T10:00:20Z", 24.0, 61.0))
            .unwrap();

        let state = tracker.train(&key).unwrap();
        let h = state.heading.unwrap();
        assert!((h.degrees() - 180.0).abs() < 1e-6);
        assert_eq!(state.fix.timestamp, "2025-05-20T10:00:20Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_out_of_order_report_is_ignored() {
        let mut tracker = Tracker::new(tracks(), LayoutParams::default(), 8);
        tracker.ingest(&message(8, "2025-05-20T10:00:10Z", 24.0, 61.0));
        assert!(
            tracker
                .ingest(&message(8, "2025-05-20T10:00:00Z", 24.0, 61.05))
                .is_none()
        );

        let state = tracker.train(&TrainKey::new("2025-05-20", 8)).unwrap();
        assert!((state.position().y() - 61.0).abs() < 1e-9);
    }

    #[test]
    fn test_fractional_seconds_compare_as_instants() {
        let mut tracker = Tracker::new(tracks(), LayoutParams::default(), 8);
        tracker.ingest(&message(8, "2025-05-20T10:00:00Z", 24.0, 61.0));

        // Later instant even though its text sorts before the previous one
        let key = tracker
            .ingest(&message(8, "2025-05-20T10:00:00.500Z", 24.0, 61.001))
            .unwrap();
        let state = tracker.train(&key).unwrap();
        assert!((state.position().y() - 61.001).abs() < 1e-9);
        assert!(state.heading.is_some());

        // Same instant written with an offset is not older, so it is accepted
        assert!(
            tracker
                .ingest(&message(8, "2025-05-20T13:00:00.500+03:00", 24.0, 61.002))
                .is_some()
        );
        assert!(
            tracker
                .ingest(&message(8, "2025-05-20T10:00:00.499Z", 24.0, 61.05))
                .is_none()
        );
    }

    #[test]
    fn test_no_tracks_renders_raw_point() {
        let mut tracker = Tracker::new(Vec::new().into(), LayoutParams::default(), 8);
        let key = tracker
            .ingest(&message(8, "2025-05-20T10:00:00Z", 24.5, 61.2))
            .unwrap();

        let render = tracker.render_state(&key).unwrap();
        assert!(!render.snapped);
        assert_eq!(render.point, Point::new(24.5, 61.2));
        assert!(render.consist.is_empty());
    }

    #[test]
    fn test_render_state_with_composition() {
        let mut tracker = Tracker::new(tracks(), LayoutParams::default(), 8);
        tracker.add_compositions([composition(8)]);
        tracker.ingest(&message(8, "2025-05-20T10:00:00Z", 24.0, 60.999));
        let key = tracker
            .ingest(&message(8, "2025-05-20T10:00:10Z", 24.0, 61.0))
            .unwrap();

        let render = tracker.render_state(&key).unwrap();
        assert!(render.snapped);
        assert_eq!(render.speed_kmh, Some(60.0));
        assert_eq!(render.consist.len(), 3);
        assert_eq!(
            render.roles,
            vec![VehicleRole::Locomotive, VehicleRole::Wagon, VehicleRole::Wagon]
        );
        assert!(render.amenities.unwrap().restaurant);
        // Wagons trail the locomotive to the south
        assert!(render.consist.footprints[1].center().y() < render.point.y());
    }

    #[test]
    fn test_render_all_filters_and_sorts() {
        let mut tracker = Tracker::new(tracks(), LayoutParams::default(), 8);
        let metadata = parse_metadata(
            r#"[{"trainNumber":9,"departureDate":"2025-05-20","trainCategory":"Commuter"},
                {"trainNumber":3,"departureDate":"2025-05-20","trainCategory":"Commuter"},
                {"trainNumber":5,"departureDate":"2025-05-20","trainCategory":"Long-distance"}]"#,
        )
        .unwrap();
        tracker.set_categories(CategoryMap::from_metadata(&metadata));

        for number in [9, 5, 3, 7] {
            tracker.ingest(&message(number, "2025-05-20T10:00:00Z", 24.0, 61.0));
        }
        assert_eq!(tracker.train_count(), 4);

        let commuters: Vec<u32> = tracker
            .render_all(CategoryFilter::Commuter)
            .iter()
            .map(|r| r.key.train_number)
            .collect();
        assert_eq!(commuters, vec![3, 9]);

        let others = tracker.render_all(CategoryFilter::Other);
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].key.train_number, 7);

        assert_eq!(tracker.render_all(CategoryFilter::All).len(), 4);
    }
}
