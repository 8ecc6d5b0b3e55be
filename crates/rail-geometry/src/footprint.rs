//! Oriented rectangular vehicle footprints

use crate::Heading;
use geo::{Destination, Haversine, LineString, Point, Polygon};

/// Corners of an oriented rectangle
///
/// Corner order is fixed as front-left, front-right, back-right, back-left,
/// so walking the corners in order never self-intersects.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RectangleFootprint {
    pub corners: [Point<f64>; 4],
}

impl RectangleFootprint {
    #[inline]
    pub fn front_left(&self) -> Point<f64> {
        self.corners[0]
    }

    #[inline]
    pub fn front_right(&self) -> Point<f64> {
        self.corners[1]
    }

    #[inline]
    pub fn back_right(&self) -> Point<f64> {
        self.corners[2]
    }

    #[inline]
    pub fn back_left(&self) -> Point<f64> {
        self.corners[3]
    }

    /// Mean of the four corners, which is also the midpoint between the
    /// front and back edge midpoints
    pub fn center(&self) -> Point<f64> {
        let (x, y) = self
            .corners
            .iter()
            .fold((0.0, 0.0), |(x, y), p| (x + p.x(), y + p.y()));
        Point::new(x / 4.0, y / 4.0)
    }

    /// Closed polygon ring for rendering
    pub fn to_polygon(&self) -> Polygon<f64> {
        let mut ring: Vec<_> = self.corners.iter().map(|p| p.0).collect();
        ring.push(self.corners[0].0);
        Polygon::new(LineString::new(ring), vec![])
    }
}

/// Build the footprint of a vehicle centered on `center`
///
/// The front and back midpoints lie `half_length_km` ahead of and behind the
/// center along `heading`; each is then offset sideways by `half_width_km`.
pub fn footprint(
    center: Point<f64>,
    heading: Heading,
    half_length_km: f64,
    half_width_km: f64,
) -> RectangleFootprint {
    let half_length_m = half_length_km * 1000.0;
    let half_width_m = half_width_km * 1000.0;

    let left = heading.offset(-90.0).degrees();
    let right = heading.offset(90.0).degrees();

    let front = Haversine.destination(center, heading.degrees(), half_length_m);
    let back = Haversine.destination(center, heading.reversed().degrees(), half_length_m);

    RectangleFootprint {
        corners: [
            Haversine.destination(front, left, half_width_m),
            Haversine.destination(front, right, half_width_m),
            Haversine.destination(back, right, half_width_m),
            Haversine.destination(back, left, half_width_m),
        ],
    }
}
