//! Locomotive and wagon footprints laid out along the track

use crate::footprint::{RectangleFootprint, footprint};
use crate::snap::snap_or_raw;
use crate::{Heading, Track};
use geo::{Destination, Haversine, Point};

/// Role of a vehicle in a consist
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleRole {
    Locomotive,
    Wagon,
}

/// Physical description of one rail vehicle
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleSpec {
    /// Length over buffers in meters
    pub length_m: f64,
    pub role: VehicleRole,
}

impl VehicleSpec {
    #[inline]
    pub fn new(length_m: f64, role: VehicleRole) -> Self {
        Self { length_m, role }
    }

    /// Build from a length in millimeters, as composition data reports it
    #[inline]
    pub fn from_millimeters(length_mm: u32, role: VehicleRole) -> Self {
        Self::new(f64::from(length_mm) / 1000.0, role)
    }

    /// Half of the vehicle length in kilometers
    #[inline]
    pub fn half_length_km(&self) -> f64 {
        self.length_m.max(0.0) / 2000.0
    }
}

/// Spacing and sizing of consist footprints
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutParams {
    /// Gap between consecutive vehicles in kilometers
    pub gap_km: f64,
    /// Half of the vehicle width in kilometers
    pub half_width_km: f64,
    /// Multiplier applied to every vehicle half length
    pub length_scale: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            gap_km: 0.001,
            half_width_km: 0.0016,
            length_scale: 1.0,
        }
    }
}

/// Footprints of a consist, index 0 being the locomotive
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsistLayout {
    pub footprints: Vec<RectangleFootprint>,
}

impl ConsistLayout {
    #[inline]
    pub fn len(&self) -> usize {
        self.footprints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.footprints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RectangleFootprint> {
        self.footprints.iter()
    }
}

/// Lay out `vehicles` behind the locomotive centered at `locomotive_center`
///
/// Each following vehicle is placed by walking back from the locomotive
/// along the reversed heading by the accumulated half lengths plus gaps,
/// then re-snapped onto `tracks` so curves are followed. Every footprint is
/// oriented with the locomotive heading rather than the local track tangent,
/// which drifts visibly on sharp curves.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn layout(
    locomotive_center: Point<f64>,
    heading: Heading,
    vehicles: &[VehicleSpec],
    params: &LayoutParams,
    tracks: &[Track],
) -> ConsistLayout {
    let backwards = heading.reversed().degrees();
    let mut offset_km = 0.0;
    let mut previous_half_km: Option<f64> = None;

    let footprints = vehicles
        .iter()
        .map(|vehicle| {
            let half_km = vehicle.half_length_km() * params.length_scale;

            let center = match previous_half_km {
                None => locomotive_center,
                Some(previous) => {
                    offset_km += previous + half_km + params.gap_km;
                    let raw =
                        Haversine.destination(locomotive_center, backwards, offset_km * 1000.0);
                    snap_or_raw(tracks, raw)
                }
            };
            previous_half_km = Some(half_km);

            footprint(center, heading, half_km, params.half_width_km)
        })
        .collect();

    ConsistLayout { footprints }
}
