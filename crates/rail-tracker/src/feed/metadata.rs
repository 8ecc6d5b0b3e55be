//! Daily train metadata and categories

use crate::Result;
use crate::feed::TrainKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// One entry of the daily train list
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrainMetadata {
    pub train_number: u32,
    pub departure_date: String,
    pub train_category: String,
}

impl TrainMetadata {
    #[inline]
    pub fn key(&self) -> TrainKey {
        TrainKey::new(self.departure_date.clone(), self.train_number)
    }
}

/// Category a train is displayed and filtered by
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TrainCategory {
    Commuter,
    LongDistance,
    #[default]
    Other,
}

impl TrainCategory {
    /// Map an upstream category name, anything unknown being `Other`
    pub fn from_api(name: &str) -> Self {
        match name {
            "Commuter" => Self::Commuter,
            "Long-distance" => Self::LongDistance,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commuter => "Commuter",
            Self::LongDistance => "Long-distance",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for TrainCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category lookup keyed by train
#[derive(Clone, Debug, Default)]
pub struct CategoryMap(HashMap<TrainKey, TrainCategory>);

impl CategoryMap {
    pub fn from_metadata(entries: &[TrainMetadata]) -> Self {
        Self(
            entries
                .iter()
                .map(|entry| (entry.key(), TrainCategory::from_api(&entry.train_category)))
                .collect(),
        )
    }

    /// Category of `key`, `Other` when the train is unknown
    #[inline]
    pub fn get(&self, key: &TrainKey) -> TrainCategory {
        self.0.get(key).copied().unwrap_or_default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn parse_metadata(json: &str) -> Result<Vec<TrainMetadata>> {
    Ok(serde_json::from_str(json)?)
}
