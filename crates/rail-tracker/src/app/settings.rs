use crate::app::state::CategoryFilter;
use clap::Parser;
use rail_geometry::{LayoutParams, SIMPLIFY_TOLERANCE_DEG};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Rail Tracker - Snap live train locations onto the rail network and emit GeoJSON
pub struct Settings {
    /// Track dataset (GeoJSON FeatureCollection in EPSG:3067)
    #[clap(short, long, value_name = "FILE")]
    pub tracks: PathBuf,

    /// Line-delimited train location messages, `-` for stdin
    #[clap(short, long, value_name = "FILE", default_value = "-")]
    pub fixes: PathBuf,

    /// Daily train list used for categories
    #[clap(short, long, value_name = "FILE")]
    pub metadata: Option<PathBuf>,

    /// Train compositions used for consist footprints
    #[clap(short, long, value_name = "FILE")]
    pub compositions: Option<PathBuf>,

    /// Only render trains of this category
    #[clap(long, value_enum, default_value_t = CategoryFilter::All)]
    pub filter: CategoryFilter,

    /// Simplification tolerance in degrees
    #[clap(long, default_value_t = SIMPLIFY_TOLERANCE_DEG)]
    pub tolerance: f64,

    /// Only keep electrified tracks
    #[clap(long, default_value = "false")]
    pub electrified_only: bool,

    /// Gap between consecutive vehicles in meters
    #[clap(long, default_value = "1.0")]
    pub gap_m: f64,

    /// Half of the vehicle width in meters
    #[clap(long, default_value = "1.6")]
    pub half_width_m: f64,

    /// Multiplier applied to vehicle lengths
    #[clap(long, default_value = "1.0")]
    pub length_scale: f64,

    /// Seconds before the track dataset is read again
    #[clap(long, default_value = "3600")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached train compositions
    #[clap(long, default_value = "256")]
    pub composition_cache_size: usize,

    /// Write the render-ready tracks as GeoJSON to this file
    #[clap(long, value_name = "FILE")]
    pub tracks_output: Option<PathBuf>,

    /// Print the updated train as a GeoJSON line after every message
    #[clap(long, default_value = "false")]
    pub stream: bool,
}

impl Settings {
    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            gap_km: self.gap_m / 1000.0,
            half_width_km: self.half_width_m / 1000.0,
            length_scale: self.length_scale,
        }
    }

    #[inline]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Whether fixes are read from standard input
    #[inline]
    pub fn fixes_from_stdin(&self) -> bool {
        self.fixes.as_os_str() == "-"
    }
}
