//! End-to-end checks of the geometry pipeline on projected input

use geo::{Distance, Haversine, Point};
use rail_geometry::{
    GeometryError, LayoutParams, ProjectedPoint, RawTrack, SIMPLIFY_TOLERANCE_DEG,
    TrackAttributes, VehicleRole, VehicleSpec, heading, layout, prepare_tracks, reproject, snap,
};

/// A straight north-bound track near Jyväskylä in ETRS-TM35FIN
fn raw_network() -> Vec<RawTrack> {
    let line: Vec<ProjectedPoint> = (0..=100)
        .map(|i| ProjectedPoint::new(435000.0, 6900000.0 + i as f64 * 50.0))
        .collect();

    vec![RawTrack {
        attributes: TrackAttributes {
            id: "001 JY".to_string(),
            description: Some("main line".to_string()),
            electrified: true,
        },
        lines: vec![line],
    }]
}

#[test]
fn test_fix_to_consist() {
    let tracks = prepare_tracks(raw_network(), SIMPLIFY_TOLERANCE_DEG);
    assert_eq!(tracks.len(), 1);
    // A dense straight run simplifies to its endpoints
    assert_eq!(tracks[0].total_points(), 2);

    // Two noisy fixes 20 m east of the track, the second one further north
    let first = reproject(ProjectedPoint::new(435020.0, 6901000.0));
    let second = reproject(ProjectedPoint::new(435020.0, 6901200.0));

    let snapped_first = snap(&tracks, first).unwrap();
    let snapped_second = snap(&tracks, second).unwrap();
    assert!(snapped_first.distance_km > 0.015 && snapped_first.distance_km < 0.025);

    let heading = heading(snapped_first.point, snapped_second.point).unwrap();
    // Grid north differs from true north by the meridian convergence
    let degrees = heading.degrees();
    assert!(degrees < 2.0 || degrees > 358.0, "heading {degrees}");

    let vehicles = [
        VehicleSpec::from_millimeters(18960, VehicleRole::Locomotive),
        VehicleSpec::from_millimeters(26400, VehicleRole::Wagon),
        VehicleSpec::from_millimeters(26400, VehicleRole::Wagon),
    ];
    let consist = layout(
        snapped_second.point,
        heading,
        &vehicles,
        &LayoutParams::default(),
        &tracks,
    );
    assert_eq!(consist.len(), 3);

    let distances: Vec<f64> = consist
        .iter()
        .map(|fp| Haversine.distance(snapped_second.point, fp.center()))
        .collect();
    assert!(distances[0] < distances[1] && distances[1] < distances[2]);
}

#[test]
fn test_stationary_vehicle_has_no_heading() {
    let tracks = prepare_tracks(raw_network(), SIMPLIFY_TOLERANCE_DEG);

    // Two different raw fixes that snap to the same on-track point
    let a = snap(&tracks, reproject(ProjectedPoint::new(435010.0, 6901000.0))).unwrap();
    let b = snap(&tracks, reproject(ProjectedPoint::new(435010.0, 6901000.0))).unwrap();
    assert_eq!(
        heading(a.point, b.point).unwrap_err(),
        GeometryError::DegenerateHeading
    );
}

#[test]
fn test_no_tracks_degrades_to_raw_point() {
    let fix = Point::new(25.7, 62.2);
    assert_eq!(snap(&[], fix).unwrap_err(), GeometryError::EmptyTrackSet);
    assert_eq!(rail_geometry::snap_or_raw(&[], fix), fix);
}
