//! Track snapshot cache with explicit expiry
//!
//! The snapshot is a plain value owned by whoever drives the application
//! loop. Time is passed in by the caller so refresh behavior is testable
//! without sleeping.

use crate::Result;
use rail_geometry::Track;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default lifetime of a fetched track snapshot
pub const DEFAULT_TRACK_TTL: Duration = Duration::from_secs(60 * 60);

/// Longest wait before retrying after a failed refresh
pub const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// A fetched track snapshot and when it was fetched
#[derive(Clone, Debug)]
pub struct CachedTracks {
    pub data: Arc<[Track]>,
    pub fetched_at: Instant,
}

/// Holds at most one track snapshot and refreshes it once its TTL elapses
#[derive(Debug)]
pub struct TrackCache {
    ttl: Duration,
    retry_interval: Duration,
    entry: Option<CachedTracks>,
    /// Set after a failed refresh; the stale snapshot is served until then
    retry_at: Option<Instant>,
}

impl Default for TrackCache {
    fn default() -> Self {
        Self::new(DEFAULT_TRACK_TTL)
    }
}

impl TrackCache {
    /// Failed refreshes are retried after the TTL or [`MAX_RETRY_INTERVAL`],
    /// whichever is shorter
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            retry_interval: ttl.min(MAX_RETRY_INTERVAL),
            entry: None,
            retry_at: None,
        }
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached snapshot, fresh or not
    #[inline]
    pub fn entry(&self) -> Option<&CachedTracks> {
        self.entry.as_ref()
    }

    #[inline]
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Whether a refresh is due at `now`
    ///
    /// True when there is no snapshot, or it is older than the TTL and no
    /// retry of a failed refresh is pending.
    pub fn is_stale(&self, now: Instant) -> bool {
        match (&self.entry, self.retry_at) {
            (None, _) => true,
            (Some(_), Some(retry_at)) => now >= retry_at,
            (Some(entry), None) => now.saturating_duration_since(entry.fetched_at) >= self.ttl,
        }
    }

    /// Return the cached tracks, calling `fetch` first if they are stale
    ///
    /// A failed refresh keeps serving the previous snapshot when there is
    /// one and postpones the next attempt by the retry interval. The error is
    /// only returned when nothing was ever fetched.
    pub fn get_or_refresh<F>(&mut self, now: Instant, fetch: F) -> Result<Arc<[Track]>>
    where
        F: FnOnce() -> Result<Vec<Track>>,
    {
        if !self.is_stale(now) {
            if let Some(entry) = &self.entry {
                return Ok(Arc::clone(&entry.data));
            }
        }

        match fetch() {
            Ok(tracks) => {
                tracing::info!("Track snapshot refreshed: {} tracks", tracks.len());
                let data: Arc<[Track]> = tracks.into();
                self.entry = Some(CachedTracks {
                    data: Arc::clone(&data),
                    fetched_at: now,
                });
                self.retry_at = None;
                Ok(data)
            }
            Err(e) => match &self.entry {
                Some(entry) => {
                    tracing::warn!(
                        "Track refresh failed, serving stale snapshot for {:?}: {}",
                        self.retry_interval,
                        e
                    );
                    self.retry_at = Some(now + self.retry_interval);
                    Ok(Arc::clone(&entry.data))
                }
                None => Err(e),
            },
        }
    }

    /// Drop the snapshot so the next access fetches
    pub fn invalidate(&mut self) {
        self.entry = None;
        self.retry_at = None;
    }
}
