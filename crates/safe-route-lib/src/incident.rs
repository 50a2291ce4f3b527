//! Incident storage
//!
//! An incident is a recorded coordinate of a past safety-relevant event. Incidents are
//! immutable once loaded; the spatial index owns its own copy of the collection.

use crate::utils;

/// A single recorded incident location
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IncidentPoint {
    /// Identifier from the source dataset (or the row ordinal when absent)
    pub id: i64,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl IncidentPoint {
    /// Create a new incident point
    pub fn new(id: i64, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            latitude,
            longitude,
        }
    }

    /// Whether the coordinates are finite and within ±90°/±180°
    #[inline]
    pub fn is_valid(&self) -> bool {
        utils::is_valid_coordinate(self.latitude, self.longitude)
    }

    /// Coordinates as a (lat, lon) pair
    #[inline]
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Great-circle distance to a (lat, lon) pair in kilometers
    #[inline]
    pub fn distance_km_to(&self, lat: f64, lon: f64) -> f64 {
        utils::haversine_km(self.latitude, self.longitude, lat, lon)
    }
}
