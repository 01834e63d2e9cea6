//! Geodesic math for candidate-point generation and zoom selection.
//!
//! Provides the direct geodesic problem (destination point from origin,
//! distance and bearing), its inverse counterparts used for verification,
//! and the Web Mercator ground-resolution formula.

mod types;

pub use types::{GeoError, Location, EARTH_RADIUS_KM, MAX_OFFSET_KM};

use std::f64::consts::PI;

/// Computes the point `distance_km` away from `origin` along `bearing_rad`.
///
/// Uses the spherical law of cosines on a sphere of radius
/// [`EARTH_RADIUS_KM`]. The bearing is measured in radians within [0, 2π].
///
/// # Errors
///
/// Returns `GeoError::InvalidDistance` if the distance is negative, not
/// finite, or at least half the Earth's circumference, and
/// `GeoError::InvalidBearing` if the bearing falls outside [0, 2π].
pub fn destination(
    origin: Location,
    distance_km: f64,
    bearing_rad: f64,
) -> Result<Location, GeoError> {
    if !distance_km.is_finite() || !(0.0..MAX_OFFSET_KM).contains(&distance_km) {
        return Err(GeoError::InvalidDistance(distance_km));
    }
    if !bearing_rad.is_finite() || !(0.0..=2.0 * PI).contains(&bearing_rad) {
        return Err(GeoError::InvalidBearing(bearing_rad));
    }

    // Angular distance on the unit sphere
    let d = distance_km / EARTH_RADIUS_KM;
    let lat1 = origin.lat().to_radians();
    let lon1 = origin.lon().to_radians();

    let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * bearing_rad.cos()).asin();
    let dlon = (bearing_rad.sin() * d.sin() * lat1.cos())
        .atan2(d.cos() - lat1.sin() * lat2.sin());
    let lon2 = lon1 - dlon;

    Location::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Ground resolution in meters per pixel at `lat_deg` and `zoom`.
///
/// `156543.03392 * cos(lat * PI / 180) / 2^zoom`, the standard Web Mercator
/// resolution formula. Monotonically non-increasing in zoom and in |latitude|.
pub fn meters_per_pixel(lat_deg: f64, zoom: u8) -> f64 {
    156_543.033_92 * (lat_deg * PI / 180.0).cos() / 2.0_f64.powi(zoom as i32)
}

/// Great-circle distance between two points in kilometers (haversine).
pub fn great_circle_distance_km(a: Location, b: Location) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon() - a.lon()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Initial great-circle bearing from `a` to `b`, in radians within [0, 2π).
///
/// Uses the same angular convention as [`destination`], so
/// `bearing_between(o, destination(o, d, tc)?)` recovers `tc`.
pub fn bearing_between(a: Location, b: Location) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    // destination() subtracts dlon from the origin longitude, so the
    // matching inverse measures lon1 - lon2.
    let dlon = (a.lon() - b.lon()).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x).rem_euclid(2.0 * PI)
}
