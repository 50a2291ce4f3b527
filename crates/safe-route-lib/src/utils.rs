//! Utility functions for great-circle distances and coordinate handling

/// Mean Earth radius in kilometers used for every haversine computation
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = EARTH_RADIUS_KM * 1000.0;

/// Approximate length of one degree of latitude in kilometers
pub const KM_PER_DEGREE: f64 = 111.32;

/// Maximum absolute latitude in degrees
pub const MAX_LATITUDE: f64 = 90.0;

/// Maximum absolute longitude in degrees
pub const MAX_LONGITUDE: f64 = 180.0;

/// Haversine great-circle distance in kilometers between two (lat, lon) pairs in degrees
#[inline]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` marginally above 1.0 for antipodal points
    let c = 2.0 * a.min(1.0).sqrt().atan2((1.0 - a).max(0.0).sqrt());

    EARTH_RADIUS_KM * c
}

/// Haversine great-circle distance in meters between two (lat, lon) pairs in degrees
#[inline]
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_km(lat1, lon1, lat2, lon2) * 1000.0
}

/// Check that a latitude/longitude pair is finite and within ±90°/±180°
#[inline]
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && lat.abs() <= MAX_LATITUDE
        && lon.abs() <= MAX_LONGITUDE
}

/// Linear interpolation between two (lat, lon) pairs at parameter `t`
#[inline]
pub fn lerp(from: (f64, f64), to: (f64, f64), t: f64) -> (f64, f64) {
    (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t)
}

/// Latitude and longitude half-widths (degrees) of a box that contains every
/// point within `radius_km` of a center at `lat` degrees
///
/// Returns `None` for the longitude half-width when the circle reaches a pole,
/// in which case every longitude must be considered.
pub fn bounding_deltas(lat: f64, radius_km: f64) -> (f64, Option<f64>) {
    let angular = radius_km / EARTH_RADIUS_KM;
    let delta_lat = angular.to_degrees();

    let cos_lat = lat.to_radians().cos();
    let sin_angular = angular.sin();
    if angular >= std::f64::consts::FRAC_PI_2 || cos_lat <= sin_angular {
        return (delta_lat, None);
    }

    let delta_lon = (sin_angular / cos_lat).asin().to_degrees();
    (delta_lat, Some(delta_lon))
}
