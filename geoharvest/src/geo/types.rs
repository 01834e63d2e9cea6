//! Geographic value types.

use std::fmt;
use thiserror::Error;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Half the Earth's circumference in kilometers.
///
/// The direct geodesic formula is ambiguous beyond the antipode, so offset
/// distances must stay below this bound.
pub const MAX_OFFSET_KM: f64 = 20_037.5;

/// Errors produced by geographic validation and the geodesic functions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// Latitude outside [-90, 90].
    #[error("invalid latitude {0}: must be within [-90, 90]")]
    InvalidLatitude(f64),

    /// Latitude or longitude was not a finite number.
    #[error("coordinate is not a finite number")]
    NonFiniteCoordinate,

    /// Offset distance was negative or beyond the antipode.
    #[error("invalid offset distance {0} km: must be within [0, {MAX_OFFSET_KM})")]
    InvalidDistance(f64),

    /// Bearing outside [0, 2π].
    #[error("invalid bearing {0} rad: must be within [0, 2*PI]")]
    InvalidBearing(f64),

    /// A `"lat,lon"` string could not be parsed.
    #[error("malformed location string {0:?}: expected \"lat,lon\"")]
    MalformedPair(String),
}

/// A geographic point in degrees.
///
/// Invariants, enforced at construction: latitude is within [-90, 90] and
/// longitude is normalized to (-180, 180]. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    lat: f64,
    lon: f64,
}

impl Location {
    /// Creates a location, validating the latitude and normalizing the
    /// longitude into (-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(GeoError::NonFiniteCoordinate);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::InvalidLatitude(lat));
        }

        let mut lon = lon.rem_euclid(360.0);
        if lon > 180.0 {
            lon -= 360.0;
        }

        Ok(Self { lat, lon })
    }

    /// Parses a comma-separated `"lat,lon"` pair, e.g. `"40.714728,-73.998672"`.
    pub fn parse(pair: &str) -> Result<Self, GeoError> {
        let (lat, lon) = pair
            .split_once(',')
            .ok_or_else(|| GeoError::MalformedPair(pair.to_string()))?;

        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| GeoError::MalformedPair(pair.to_string()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| GeoError::MalformedPair(pair.to_string()))?;

        Self::new(lat, lon)
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl fmt::Display for Location {
    /// Formats as the comma-separated pair used in request URLs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_valid_coordinates() {
        let loc = Location::new(40.714728, -73.998672).unwrap();
        assert_eq!(loc.lat(), 40.714728);
        assert_eq!(loc.lon(), -73.998672);
    }

    #[test]
    fn test_new_rejects_out_of_range_latitude() {
        assert_eq!(
            Location::new(90.5, 0.0).unwrap_err(),
            GeoError::InvalidLatitude(90.5)
        );
        assert_eq!(
            Location::new(-91.0, 0.0).unwrap_err(),
            GeoError::InvalidLatitude(-91.0)
        );
    }

    #[test]
    fn test_new_rejects_non_finite() {
        assert_eq!(
            Location::new(f64::NAN, 0.0).unwrap_err(),
            GeoError::NonFiniteCoordinate
        );
        assert_eq!(
            Location::new(0.0, f64::INFINITY).unwrap_err(),
            GeoError::NonFiniteCoordinate
        );
    }

    #[test]
    fn test_longitude_normalization() {
        // 190 E wraps to -170
        assert_eq!(Location::new(0.0, 190.0).unwrap().lon(), -170.0);
        // -190 wraps to 170
        assert_eq!(Location::new(0.0, -190.0).unwrap().lon(), 170.0);
        // The antimeridian itself maps to +180, not -180
        assert_eq!(Location::new(0.0, -180.0).unwrap().lon(), 180.0);
        assert_eq!(Location::new(0.0, 540.0).unwrap().lon(), 180.0);
        // In-range values pass through unchanged
        assert_eq!(Location::new(0.0, 180.0).unwrap().lon(), 180.0);
        assert_eq!(Location::new(0.0, -179.9).unwrap().lon(), -179.9);
    }

    #[test]
    fn test_parse_round_trips_display() {
        let loc = Location::parse("40.714728,-73.998672").unwrap();
        assert_eq!(loc.to_string(), "40.714728,-73.998672");
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let loc = Location::parse(" 51.5074 , -0.1278 ").unwrap();
        assert_eq!(loc.lat(), 51.5074);
        assert_eq!(loc.lon(), -0.1278);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Location::parse("not a location"),
            Err(GeoError::MalformedPair(_))
        ));
        assert!(matches!(
            Location::parse("51.5;0.1"),
            Err(GeoError::MalformedPair(_))
        ));
        assert!(matches!(
            Location::parse("91.0,0.0"),
            Err(GeoError::InvalidLatitude(_))
        ));
    }
}
