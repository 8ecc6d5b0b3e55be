//! Rail Geometry - Core geometry engine for live rail vehicle rendering
//!
//! This library turns surveyed track geometry and noisy vehicle fixes into
//! render-ready shapes. Every operation is synchronous and works on plain
//! values handed in by the caller: track snapshots are borrowed as immutable
//! slices and nothing is cached between calls.
//!
//! # Architecture
//!
//! - **[`projection`]**: ETRS-TM35FIN (EPSG:3067) to WGS84 reprojection
//! - **[`simplify`]**: Douglas-Peucker polyline simplification
//! - **[`Track`]**: Validated multi-line track geometry with attributes
//! - **[`snap`]**: Nearest on-track point for a vehicle fix
//! - **[`heading`]**: Initial bearing between two snapped points
//! - **[`footprint`]**: Oriented rectangle around a vehicle center
//! - **[`layout`]**: Locomotive and wagon footprints placed along the track
//!
//! # Pipeline
//!
//! ```text
//! RawTrack ──reproject──▶ simplify ──▶ Track (cached by the caller)
//! fix + &[Track] ──snap──▶ SnappedFix ──heading──▶ Heading
//! SnappedFix + Heading + [VehicleSpec] ──layout──▶ ConsistLayout
//! ```

mod consist;
mod footprint;
mod heading;
pub mod projection;
pub mod simplify;
mod snap;
mod track;

// Public API exports
pub use consist::{ConsistLayout, LayoutParams, VehicleRole, VehicleSpec, layout};
pub use footprint::{RectangleFootprint, footprint};
pub use heading::{Heading, heading};
pub use projection::{ProjectedPoint, reproject, reproject_line};
pub use simplify::{SIMPLIFY_TOLERANCE_DEG, simplify};
pub use snap::{SnappedFix, VehicleFix, snap, snap_fix, snap_or_raw};
pub use track::{RawTrack, Track, TrackAttributes, prepare_tracks};

/// Error types for the geometry engine
///
/// Every variant is local and recoverable: callers degrade rendering
/// fidelity (raw point instead of snapped, previous heading kept) instead
/// of aborting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// Coordinates lie outside the projected CRS extent.
    ///
    /// [`reproject`] never returns this; range checks are the caller's job.
    #[error("Projected coordinate ({x}, {y}) is outside the source CRS extent")]
    ProjectionOutOfDomain { x: f64, y: f64 },

    #[error("No track geometry to snap against")]
    EmptyTrackSet,

    #[error("Heading is undefined between coincident points")]
    DegenerateHeading,

    #[error("Malformed geometry: line string with {points} point(s), at least 2 required")]
    MalformedGeometry { points: usize },
}

pub type Result<T> = std::result::Result<T, GeometryError>;
