//! Rail Tracker - Live train positions on the rail network
//!
//! This crate is the application layer around [`rail_geometry`]. It parses
//! the upstream data formats (track dataset, train-location messages, train
//! metadata and compositions), keeps the track snapshot in an explicit TTL
//! cache, tracks per-train state and produces render-ready GeoJSON.
//!
//! # Architecture
//!
//! - **[`feed`]**: Wire models and parsers for every upstream source
//! - **[`cache::TrackCache`]**: Track snapshot with its fetch time and TTL
//! - **[`app::state::Tracker`]**: Per-train snapped position, heading and consist
//! - **[`render`]**: GeoJSON adapters for tracks and render states

pub mod app;
pub mod cache;
pub mod feed;
pub mod logging;
pub mod render;

pub use app::settings::Settings;
pub use app::state::{RenderState, Tracker, TrainState};
pub use feed::TrainKey;

use rail_geometry::GeometryError;

/// Error types for the tracker
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_errors_convert() {
        let err: TrackerError = GeometryError::EmptyTrackSet.into();
        assert!(matches!(err, TrackerError::Geometry(GeometryError::EmptyTrackSet)));
        assert!(err.to_string().starts_with("Geometry error"));
    }
}
