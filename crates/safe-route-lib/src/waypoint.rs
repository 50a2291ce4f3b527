//! Synthetic waypoint generation
//!
//! Waypoints are intermediate coordinates placed along the straight line between source and
//! destination and pushed sideways by a random amount. The sideways offset follows a parabolic
//! envelope: zero at the endpoints, largest at the midpoint.

use crate::{Result, RouteError, utils};
use rand::Rng;

/// Maximum lateral offset as a fraction of the direct distance
const VARIATION_FACTOR: f64 = 0.03;

/// Upper bound on intermediate waypoints per route
pub const MAX_WAYPOINT_COUNT: usize = 10_000;

/// Below this cosine the longitude correction is meaningless and the offset is not applied
const MIN_COS_LATITUDE: f64 = 1e-9;

/// A coordinate along a generated route
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waypoint {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl Waypoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Coordinates as a (lat, lon) pair
    #[inline]
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Great-circle distance to another waypoint in meters
    #[inline]
    pub fn distance_m(&self, other: &Waypoint) -> f64 {
        utils::haversine_m(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl From<(f64, f64)> for Waypoint {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

impl From<Waypoint> for geo::Point<f64> {
    fn from(waypoint: Waypoint) -> Self {
        geo::Point::new(waypoint.longitude, waypoint.latitude)
    }
}

/// Generates jittered intermediate waypoints between two endpoints
#[derive(Clone, Copy, Debug)]
pub struct WaypointGenerator {
    /// Number of intermediate waypoints (the output has `count + 2` entries)
    pub count: usize,
}

impl Default for WaypointGenerator {
    fn default() -> Self {
        Self { count: 8 }
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl WaypointGenerator {
    pub fn new(count: usize) -> Self {
        Self { count }
    }

    /// Generate `count + 2` waypoints from `src` to `dst`
    ///
    /// The first and last waypoints are exactly `src` and `dst`. One uniform value in
    /// [-1, 1] is drawn from `rng` per intermediate waypoint, in order, so a seeded RNG
    /// reproduces the same sequence.
    ///
    /// # Errors
    /// Returns [`RouteError::InvalidInput`] if either endpoint is non-finite or out of range.
    pub fn generate<R: Rng>(
        &self,
        src: (f64, f64),
        dst: (f64, f64),
        rng: &mut R,
    ) -> Result<Vec<Waypoint>> {
        for (name, (lat, lon)) in [("source", src), ("destination", dst)] {
            if !utils::is_valid_coordinate(lat, lon) {
                return Err(RouteError::InvalidInput(format!(
                    "{name} coordinate ({lat}, {lon}) is not a finite latitude/longitude"
                )));
            }
        }

        let total = match self.count.checked_add(2) {
            Some(total) if self.count <= MAX_WAYPOINT_COUNT => total,
            _ => {
                return Err(RouteError::InvalidInput(format!(
                    "waypoint count {} exceeds the maximum of {}",
                    self.count, MAX_WAYPOINT_COUNT
                )));
            }
        };
        if src == dst {
            return Ok(vec![Waypoint::from(src); total]);
        }

        let lat_diff = dst.0 - src.0;
        let lon_diff = dst.1 - src.1;
        let direct_km = utils::haversine_km(src.0, src.1, dst.0, dst.1);

        // Perpendicular to the direct vector in degree space
        let norm = lat_diff.hypot(lon_diff);
        let (perp_lat, perp_lon) = (-lon_diff / norm, lat_diff / norm);

        let mut waypoints = Vec::with_capacity(total);
        waypoints.push(Waypoint::from(src));

        for i in 1..=self.count {
            let t = i as f64 / (self.count + 1) as f64;
            let (base_lat, base_lon) = utils::lerp(src, dst, t);

            let envelope = 4.0 * t * (1.0 - t);
            let jitter: f64 = rng.gen_range(-1.0..=1.0);
            let offset_km = VARIATION_FACTOR * envelope * direct_km * jitter;

            let latitude = base_lat + perp_lat * offset_km / utils::KM_PER_DEGREE;
            let cos_lat = base_lat.to_radians().cos();
            let longitude = if cos_lat.abs() < MIN_COS_LATITUDE {
                base_lon
            } else {
                base_lon + perp_lon * offset_km / (utils::KM_PER_DEGREE * cos_lat)
            };

            waypoints.push(Waypoint::new(latitude, longitude));
        }

        waypoints.push(Waypoint::from(dst));
        Ok(waypoints)
    }
}
