//! Train-location messages
//!
//! The live feed publishes one JSON message per position report. Messages
//! for different trains arrive interleaved with no ordering guarantee.

use crate::feed::TrainKey;
use crate::{Result, TrackerError};
use chrono::{DateTime, Utc};
use geo::Point;
use rail_geometry::{ProjectedPoint, VehicleFix, reproject};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// GeoJSON point as embedded in location messages
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LocationGeometry {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// `[x, y]`: longitude/latitude, or projected meters for some sources
    pub coordinates: [f64; 2],
}

/// A single position report of one train
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrainLocation {
    pub train_number: u32,
    pub departure_date: String,
    /// Report time, parsed from RFC 3339 with any offset
    pub timestamp: DateTime<Utc>,
    pub location: LocationGeometry,
    /// Speed in km/h
    #[serde(default)]
    pub speed: Option<f64>,
    /// Reported position accuracy in meters
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl TrainLocation {
    #[inline]
    pub fn key(&self) -> TrainKey {
        TrainKey::new(self.departure_date.clone(), self.train_number)
    }

    /// WGS84 position of the report
    ///
    /// Coordinates outside the geographic range are taken to be projected
    /// source CRS meters and are reprojected.
    pub fn position(&self) -> Point<f64> {
        let [x, y] = self.location.coordinates;
        if x.abs() > 180.0 || y.abs() > 90.0 {
            reproject(ProjectedPoint::new(x, y))
        } else {
            Point::new(x, y)
        }
    }

    pub fn to_fix(&self) -> VehicleFix {
        VehicleFix {
            point: self.position(),
            timestamp: self.timestamp,
            speed_kmh: self.speed,
        }
    }
}

/// Parse and validate one message
pub fn parse_message(line: &str) -> Result<TrainLocation> {
    let location: TrainLocation = serde_json::from_str(line)?;
    let [x, y] = location.location.coordinates;
    if !x.is_finite() || !y.is_finite() {
        return Err(TrackerError::InvalidMessage(format!(
            "non-finite coordinates for train {}",
            location.key()
        )));
    }
    if location.departure_date.is_empty() {
        return Err(TrackerError::InvalidMessage(format!(
            "missing departure date for train {}",
            location.train_number
        )));
    }
    Ok(location)
}

/// Read line-delimited messages and forward them to `tx`
///
/// Malformed lines are logged and skipped. Stops at end of input or when the
/// receiver is dropped.
///
/// # Returns
/// The number of messages forwarded
pub async fn read_messages<R>(reader: R, tx: mpsc::Sender<TrainLocation>) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_message(line) {
            Ok(location) => {
                if tx.send(location).await.is_err() {
                    tracing::debug!("Location receiver dropped, stopping reader");
                    break;
                }
                forwarded += 1;
            }
            Err(e) => tracing::warn!("Skipping feed line {}: {}", line_number, e),
        }
    }

    tracing::debug!("Read {} location messages", forwarded);
    Ok(forwarded)
}
