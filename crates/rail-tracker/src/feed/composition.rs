//! Train compositions: locomotives, wagons and on-board amenities
//!
//! Compositions are looked up on demand and kept in an LRU cache keyed by
//! train, since the same handful of selected trains are queried repeatedly.

use crate::Result;
use crate::feed::TrainKey;
use lru::LruCache;
use rail_geometry::{VehicleRole, VehicleSpec};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Length used for locomotives, which the composition data does not report
pub const DEFAULT_LOCOMOTIVE_LENGTH_MM: u32 = 18_960;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Locomotive {
    /// Position in the consist, 1 being the front
    pub location: u32,
    pub locomotive_type: String,
    pub power_type: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wagon {
    /// Position in the consist, 1 being the front
    pub location: u32,
    #[serde(default)]
    pub wagon_type: Option<String>,
    #[serde(default)]
    pub sales_number: Option<u32>,
    /// Length in millimeters
    pub length: u32,
    #[serde(default)]
    pub playground: bool,
    #[serde(default)]
    pub video: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub catering: bool,
    #[serde(default)]
    pub pet: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JourneySection {
    #[serde(default)]
    pub locomotives: Vec<Locomotive>,
    #[serde(default)]
    pub wagons: Vec<Wagon>,
    /// Total length in meters
    #[serde(default)]
    pub total_length: Option<u32>,
    /// Maximum speed in km/h
    #[serde(default)]
    pub maximum_speed: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub train_number: u32,
    pub departure_date: String,
    #[serde(default)]
    pub train_category: Option<String>,
    #[serde(default)]
    pub train_type: Option<String>,
    #[serde(default)]
    pub journey_sections: Vec<JourneySection>,
}

/// On-board services of a train
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Amenities {
    pub restaurant: bool,
    pub playground: bool,
    pub pet: bool,
    pub accessible: bool,
}

impl Composition {
    #[inline]
    pub fn key(&self) -> TrainKey {
        TrainKey::new(self.departure_date.clone(), self.train_number)
    }

    /// The section the train is currently running, which is the first one listed
    #[inline]
    pub fn current_section(&self) -> Option<&JourneySection> {
        self.journey_sections.first()
    }

    pub fn amenities(&self) -> Amenities {
        let wagons = self
            .current_section()
            .map(|section| section.wagons.as_slice())
            .unwrap_or_default();

        Amenities {
            restaurant: wagons.iter().any(|w| w.catering),
            playground: wagons.iter().any(|w| w.playground),
            pet: wagons.iter().any(|w| w.pet),
            accessible: wagons.iter().any(|w| w.disabled),
        }
    }

    /// Vehicles front to back: locomotives first, then wagons by position
    ///
    /// Locomotive lengths are not reported, so every locomotive gets
    /// [`DEFAULT_LOCOMOTIVE_LENGTH_MM`].
    pub fn vehicle_specs(&self) -> Vec<VehicleSpec> {
        let Some(section) = self.current_section() else {
            return Vec::new();
        };

        let locomotive =
            VehicleSpec::from_millimeters(DEFAULT_LOCOMOTIVE_LENGTH_MM, VehicleRole::Locomotive);
        let mut wagons: Vec<&Wagon> = section.wagons.iter().collect();
        wagons.sort_by_key(|w| w.location);

        std::iter::repeat_n(locomotive, section.locomotives.len())
            .chain(
                wagons
                    .iter()
                    .map(|w| VehicleSpec::from_millimeters(w.length, VehicleRole::Wagon)),
            )
            .collect()
    }
}

pub fn parse_compositions(json: &str) -> Result<Vec<Composition>> {
    Ok(serde_json::from_str(json)?)
}

/// Bounded cache of compositions keyed by train
pub struct CompositionCache {
    inner: LruCache<TrainKey, Arc<Composition>>,
}

impl CompositionCache {
    /// Create a cache holding at most `capacity` compositions (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(capacity),
        }
    }

    pub fn insert(&mut self, composition: Composition) {
        let key = composition.key();
        if let Some((evicted, _)) = self.inner.push(key.clone(), Arc::new(composition)) {
            if evicted != key {
                tracing::debug!("Evicted composition of train {}", evicted);
            }
        }
    }

    /// Look up and mark as recently used
    pub fn get(&mut self, key: &TrainKey) -> Option<Arc<Composition>> {
        self.inner.get(key).cloned()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPOSITION: &str = r#"{
        "trainNumber": 8,
        "departureDate": "2025-05-20",
        "trainCategory": "Long-distance",
        "trainType": "IC",
        "journeySections": [{
            "locomotives": [{"location": 1, "locomotiveType": "Sr2", "powerType": "Electric"}],
            "wagons": [
                {"location": 3, "wagonType": "Edm", "salesNumber": 2, "length": 27300, "playground": true},
                {"location": 2, "wagonType": "Ravintola", "salesNumber": 1, "length": 26400, "catering": true, "disabled": true}
            ],
            "totalLength": 73,
            "maximumSpeed": 200
        }]
    }"#;

    fn composition() -> Composition {
        serde_json::from_str(COMPOSITION).unwrap()
    }

    #[test]
    fn test_vehicle_specs_front_to_back() {
        let specs = composition().vehicle_specs();

        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].role, VehicleRole::Locomotive);
        assert_eq!(specs[0].length_m, 18.96);
        // Wagons ordered by location, not by listing order
        assert_eq!(specs[1].length_m, 26.4);
        assert_eq!(specs[2].length_m, 27.3);
        assert_eq!(specs[2].role, VehicleRole::Wagon);
    }

    #[test]
    fn test_amenities() {
        let amenities = composition().amenities();
        assert!(amenities.restaurant);
        assert!(amenities.playground);
        assert!(amenities.accessible);
        assert!(!amenities.pet);
    }

    #[test]
    fn test_no_sections() {
        let empty = Composition {
            journey_sections: vec![],
            ..composition()
        };
        assert!(empty.vehicle_specs().is_empty());
        assert_eq!(empty.amenities(), Amenities::default());
    }

    #[test]
    fn test_parse_compositions() {
        let json = format!("[{COMPOSITION}]");
        let parsed = parse_compositions(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].key(), TrainKey::new("2025-05-20", 8));
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let mut cache = CompositionCache::new(2);
        for number in [1, 2] {
            cache.insert(Composition {
                train_number: number,
                ..composition()
            });
        }

        // Touch 1 so that 2 is evicted next
        assert!(cache.get(&TrainKey::new("2025-05-20", 1)).is_some());
        cache.insert(Composition {
            train_number: 3,
            ..composition()
        });

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&TrainKey::new("2025-05-20", 1)).is_some());
        assert!(cache.get(&TrainKey::new("2025-05-20", 2)).is_none());
        assert!(cache.get(&TrainKey::new("2025-05-20", 3)).is_some());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache = CompositionCache::new(0);
        cache.insert(composition());
        assert_eq!(cache.len(), 1);
    }
}
