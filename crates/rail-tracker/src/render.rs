//! GeoJSON output
//!
//! Adapters from core types to GeoJSON FeatureCollections, for whatever map
//! layer draws them.

use crate::app::state::RenderState;
use chrono::SecondsFormat;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use rail_geometry::{Track, VehicleRole};
use serde_json::json;

fn role_name(role: VehicleRole) -> &'static str {
    match role {
        VehicleRole::Locomotive => "locomotive",
        VehicleRole::Wagon => "wagon",
    }
}

/// A feature with the given geometry and no properties yet
fn feature(value: Value) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: None,
        foreign_members: None,
    }
}

pub fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Render-ready tracks with their attributes
pub fn tracks_to_geojson(tracks: &[Track]) -> FeatureCollection {
    let features = tracks
        .iter()
        .map(|track| {
            let attributes = track.attributes();
            let mut feature = feature(Value::from(track.lines()));
            feature.set_property("id", attributes.id.clone());
            feature.set_property("description", attributes.description.clone());
            feature.set_property("electrified", attributes.electrified);
            feature
        })
        .collect();

    feature_collection(features)
}

/// Features of one train: its position followed by one polygon per vehicle
pub fn render_state_features(state: &RenderState) -> Vec<Feature> {
    let key = state.key.to_string();
    let amenities = state.amenities.map(|a| {
        json!({
            "restaurant": a.restaurant,
            "playground": a.playground,
            "pet": a.pet,
            "accessible": a.accessible,
        })
    });

    let mut position = feature(Value::from(&state.point));
    position.set_property("train", key.clone());
    position.set_property("trainNumber", state.key.train_number);
    position.set_property("departureDate", state.key.departure_date.clone());
    position.set_property("category", state.category.as_str());
    position.set_property("heading", state.heading.map(f64::from));
    position.set_property("speed", state.speed_kmh);
    position.set_property(
        "timestamp",
        state.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    position.set_property("snapped", state.snapped);
    position.set_property("amenities", amenities);

    let vehicles = state
        .consist
        .iter()
        .zip(&state.roles)
        .enumerate()
        .map(|(index, (footprint, role))| {
            let mut vehicle = feature(Value::from(&footprint.to_polygon()));
            vehicle.set_property("train", key.clone());
            vehicle.set_property("vehicle", index);
            vehicle.set_property("role", role_name(*role));
            vehicle
        });

    std::iter::once(position).chain(vehicles).collect()
}

pub fn render_states_to_geojson(states: &[RenderState]) -> FeatureCollection {
    feature_collection(states.iter().flat_map(render_state_features).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrainKey;
    use crate::feed::metadata::TrainCategory;
    use geo::{MultiLineString, Point, line_string};
    use rail_geometry::{
        Heading, LayoutParams, TrackAttributes, VehicleSpec, layout,
    };

    fn track() -> Track {
        Track::new(
            TrackAttributes {
                id: "001".to_string(),
                description: Some("Main line".to_string()),
                electrified: true,
            },
            MultiLineString::new(vec![line_string![(x: 24.0, y: 60.9), (x: 24.0, y: 61.1)]]),
        )
        .unwrap()
    }

    fn render_state(with_consist: bool) -> RenderState {
        let point = Point::new(24.0, 61.0);
        let vehicles = vec![
            VehicleSpec::from_millimeters(18960, VehicleRole::Locomotive),
            VehicleSpec::from_millimeters(26400, VehicleRole::Wagon),
        ];
        let (consist, roles) = if with_consist {
            (
                layout(point, Heading::NORTH, &vehicles, &LayoutParams::default(), &[track()]),
                vehicles.iter().map(|v| v.role).collect(),
            )
        } else {
            Default::default()
        };

        RenderState {
            key: TrainKey::new("2025-05-20", 8),
            category: TrainCategory::LongDistance,
            point,
            snapped: true,
            heading: with_consist.then_some(Heading::NORTH),
            speed_kmh: Some(120.0),
            timestamp: "2025-05-20T10:00:00Z".parse().unwrap(),
            amenities: None,
            consist,
            roles,
        }
    }

    #[test]
    fn test_tracks_to_geojson() {
        let geojson = serde_json::to_value(tracks_to_geojson(&[track()])).unwrap();
        let feature = &geojson["features"][0];

        assert_eq!(geojson["type"], "FeatureCollection");
        assert_eq!(feature["geometry"]["type"], "MultiLineString");
        assert_eq!(feature["geometry"]["coordinates"][0][1], json!([24.0, 61.1]));
        assert_eq!(feature["properties"]["id"], "001");
        assert_eq!(feature["properties"]["electrified"], true);
    }

    #[test]
    fn test_render_state_features() {
        let features: Vec<serde_json::Value> = render_state_features(&render_state(true))
            .iter()
            .map(|f| serde_json::to_value(f).unwrap())
            .collect();
        assert_eq!(features.len(), 3);

        let position = &features[0];
        assert_eq!(position["geometry"]["coordinates"], json!([24.0, 61.0]));
        assert_eq!(position["properties"]["train"], "2025-05-20#8");
        assert_eq!(position["properties"]["category"], "Long-distance");
        assert_eq!(position["properties"]["heading"], 0.0);
        assert_eq!(position["properties"]["timestamp"], "2025-05-20T10:00:00.000Z");
        assert!(position["properties"]["amenities"].is_null());

        let wagon = &features[2];
        assert_eq!(wagon["geometry"]["type"], "Polygon");
        assert_eq!(wagon["properties"]["vehicle"], 1);
        assert_eq!(wagon["properties"]["role"], "wagon");

        // Closed ring of four corners
        let ring = wagon["geometry"]["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);
    }

    #[test]
    fn test_unknown_heading_is_null() {
        let geojson = serde_json::to_value(render_states_to_geojson(&[render_state(false)])).unwrap();
        let features = geojson["features"].as_array().unwrap();

        assert_eq!(features.len(), 1);
        assert!(features[0]["properties"]["heading"].is_null());
    }
}
