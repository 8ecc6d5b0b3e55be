//! Application module
//!
//! Wires the feeds into a [`Tracker`]:
//! - Track dataset loaded through the TTL [`TrackCache`] and re-read on expiry
//! - Metadata and compositions loaded once at startup
//! - Location messages read on a background task and applied in order of arrival
//! - Render states written to stdout as GeoJSON

pub mod settings;
pub mod state;

use crate::app::settings::Settings;
use crate::app::state::Tracker;
use crate::cache::TrackCache;
use crate::feed::composition::parse_compositions;
use crate::feed::dataset::load_tracks;
use crate::feed::location::{TrainLocation, read_messages};
use crate::feed::metadata::{CategoryMap, parse_metadata};
use crate::render::{feature_collection, render_state_features, render_states_to_geojson, tracks_to_geojson};
use crate::Result;
use rail_geometry::Track;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Location messages buffered between the reader task and the tracker
const CHANNEL_CAPACITY: usize = 1024;

/// Return the current track snapshot, reading the dataset again if the TTL elapsed
async fn current_tracks(cache: &mut TrackCache, settings: &Settings) -> Result<Arc<[Track]>> {
    let now = Instant::now();
    if !cache.is_stale(now) {
        if let Some(entry) = cache.entry() {
            return Ok(Arc::clone(&entry.data));
        }
    }

    tracing::info!("Loading track dataset {}", settings.tracks.display());
    let loaded = match tokio::fs::read_to_string(&settings.tracks).await {
        Ok(document) => {
            let tolerance = settings.tolerance;
            let electrified_only = settings.electrified_only;
            // Reprojection and simplification are CPU bound
            tokio::task::spawn_blocking(move || load_tracks(&document, tolerance, electrified_only))
                .await
                .unwrap_or_else(|e| Err(e.into()))
        }
        Err(e) => Err(e.into()),
    };

    cache.get_or_refresh(now, move || loaded)
}

/// Read an optional side document, logging instead of failing
async fn read_optional<T>(path: Option<&Path>, parse: fn(&str) -> Result<T>) -> Option<T> {
    let path = path?;
    let parsed = match tokio::fs::read_to_string(path).await {
        Ok(document) => parse(&document),
        Err(e) => Err(e.into()),
    };

    match parsed {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring {}: {}", path.display(), e);
            None
        }
    }
}

async fn read_fixes(source: PathBuf, from_stdin: bool, tx: mpsc::Sender<TrainLocation>) -> Result<usize> {
    if from_stdin {
        tracing::info!("Reading train locations from stdin");
        read_messages(BufReader::new(tokio::io::stdin()), tx).await
    } else {
        tracing::info!("Reading train locations from {}", source.display());
        let file = tokio::fs::File::open(&source).await?;
        read_messages(BufReader::new(file), tx).await
    }
}

async fn write_line<T: serde::Serialize>(out: &mut tokio::io::Stdout, value: &T) -> Result<()> {
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    Ok(())
}

/// Run the tracker until the location stream ends
pub async fn run(settings: Settings) -> Result<()> {
    let mut cache = TrackCache::new(settings.cache_ttl());
    let tracks = current_tracks(&mut cache, &settings).await?;

    if let Some(path) = &settings.tracks_output {
        let geojson = serde_json::to_vec(&tracks_to_geojson(&tracks))?;
        tokio::fs::write(path, geojson).await?;
        tracing::info!("Wrote {} tracks to {}", tracks.len(), path.display());
    }

    let mut tracker = Tracker::new(tracks, settings.layout_params(), settings.composition_cache_size);

    if let Some(metadata) = read_optional(settings.metadata.as_deref(), parse_metadata).await {
        let categories = CategoryMap::from_metadata(&metadata);
        tracing::info!("Loaded categories for {} trains", categories.len());
        tracker.set_categories(categories);
    }
    if let Some(compositions) = read_optional(settings.compositions.as_deref(), parse_compositions).await {
        tracing::info!("Loaded {} compositions", compositions.len());
        tracker.add_compositions(compositions);
    }

    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    let reader = tokio::spawn(read_fixes(settings.fixes.clone(), settings.fixes_from_stdin(), tx));

    let mut stdout = tokio::io::stdout();
    let mut processed = 0usize;

    while let Some(location) = rx.recv().await {
        let tracks = current_tracks(&mut cache, &settings).await?;
        if !Arc::ptr_eq(&tracks, tracker.tracks()) {
            tracker.set_tracks(tracks);
        }

        let Some(key) = tracker.ingest(&location) else {
            continue;
        };
        processed += 1;

        if settings.stream {
            if let Some(state) = tracker.render_state(&key) {
                if settings.filter.matches(state.category) {
                    write_line(&mut stdout, &feature_collection(render_state_features(&state))).await?;
                }
            }
        }
    }

    match reader.await {
        Ok(Ok(read)) => tracing::debug!("Location reader finished after {} messages", read),
        Ok(Err(e)) => return Err(e),
        Err(e) => tracing::error!("Location reader task failed: {}", e),
    }

    let states = tracker.render_all(settings.filter);
    tracing::info!(
        "Processed {} messages for {} trains, rendering {}",
        processed,
        tracker.train_count(),
        states.len()
    );

    write_line(&mut stdout, &render_states_to_geojson(&states)).await?;
    stdout.flush().await?;
    Ok(())
}
