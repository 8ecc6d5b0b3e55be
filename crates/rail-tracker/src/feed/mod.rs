//! Upstream data sources
//!
//! Each submodule holds the serde models of one upstream document type and
//! the conversion into core geometry types. Nothing here performs network
//! I/O: documents arrive as strings or line streams from whatever transport
//! the caller uses.

pub mod composition;
pub mod dataset;
pub mod location;
pub mod metadata;

use std::fmt;

/// Identifies one train run: departure date plus train number
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrainKey {
    /// Departure date as `YYYY-MM-DD`
    pub departure_date: String,
    pub train_number: u32,
}

impl TrainKey {
    pub fn new(departure_date: impl Into<String>, train_number: u32) -> Self {
        Self {
            departure_date: departure_date.into(),
            train_number,
        }
    }
}

impl fmt::Display for TrainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.departure_date, self.train_number)
    }
}
