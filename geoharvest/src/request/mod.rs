//! Request-URL construction for the Google Maps web service endpoints.
//!
//! [`MapsApi`] holds the credentials and knows the URL shape of every
//! endpoint the crate talks to. Imagery URLs are signed when a signing
//! secret is configured.

use crate::geo::{bearing_between, Location};
use crate::probe::MetadataSource;
use crate::signer::{self, SignError};
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const API_ROOT: &str = "https://maps.googleapis.com/maps/api";

/// Errors from request construction.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("API key must not be empty")]
    EmptyApiKey,

    #[error(transparent)]
    Sign(#[from] SignError),
}

/// Rectangular pixel dimensions of a requested image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::square(640)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let width = w.parse::<u32>().map_err(|e| format!("bad width: {e}"))?;
        let height = h.parse::<u32>().map_err(|e| format!("bad height: {e}"))?;
        Ok(Self { width, height })
    }
}

/// Encoding of a static map image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Gif,
}

impl ImageFormat {
    /// Value of the `format` query parameter.
    pub fn as_query_value(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
        }
    }

    /// File extension used when storing the artifact.
    pub fn extension(&self) -> &'static str {
        self.as_query_value()
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "gif" => Ok(Self::Gif),
            other => Err(format!("unsupported image format {other:?}")),
        }
    }
}

/// How the compass heading of a street-level image is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeadingMode {
    /// Uniform random heading in [0, 360).
    Random,
    /// A fixed heading in degrees (0 = north, 90 = east).
    Fixed(f64),
    /// Point the camera from the candidate back toward the anchor point.
    TowardAnchor,
}

impl HeadingMode {
    /// Resolves the mode into a concrete heading for one candidate.
    pub fn resolve<R: Rng>(&self, candidate: Location, anchor: Location, rng: &mut R) -> f64 {
        match self {
            Self::Random => rng.random_range(0.0..360.0),
            Self::Fixed(heading) => *heading,
            Self::TowardAnchor => {
                // bearing_between shares destination()'s mirrored longitude
                // convention; compass headings use the true orientation.
                (360.0 - bearing_between(candidate, anchor).to_degrees()).rem_euclid(360.0)
            }
        }
    }
}

/// Parameters of a street-level image request, minus the location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreetViewImageSpec {
    pub size: ImageSize,
    /// Resolved compass heading in degrees.
    pub heading: f64,
    /// Horizontal field of view in degrees, at most 120.
    pub fov: u32,
    /// Camera pitch relative to the vehicle, within [-90, 90].
    pub pitch: f64,
    /// Panorama search radius in meters.
    pub search_radius_m: u32,
    pub outdoor_only: bool,
}

/// Credential-holding URL builder for the Maps endpoints.
#[derive(Debug, Clone)]
pub struct MapsApi {
    api_key: String,
    secret: Option<String>,
}

impl MapsApi {
    pub fn new(api_key: impl Into<String>) -> Result<Self, RequestError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RequestError::EmptyApiKey);
        }
        Ok(Self {
            api_key,
            secret: None,
        })
    }

    /// Attaches a URL-signing secret. Imagery URLs built afterwards carry
    /// an HMAC-SHA1 signature parameter.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    fn maybe_sign(&self, url: String) -> Result<String, RequestError> {
        match &self.secret {
            Some(secret) => Ok(signer::sign_url(&url, secret)?),
            None => Ok(url),
        }
    }

    /// Street-level panorama metadata endpoint, used for availability
    /// probing. Free of charge, never signed.
    pub fn street_view_metadata_url(
        &self,
        location: &Location,
        search_radius_m: u32,
        outdoor_only: bool,
    ) -> String {
        let source = if outdoor_only { "&source=outdoor" } else { "" };
        format!(
            "{API_ROOT}/streetview/metadata?location={location}{source}&radius={search_radius_m}&key={key}",
            key = self.api_key,
        )
    }

    /// Street-level static image endpoint. Signed when a secret is set.
    pub fn street_view_image_url(
        &self,
        location: &Location,
        spec: &StreetViewImageSpec,
    ) -> Result<String, RequestError> {
        let source = if spec.outdoor_only {
            "&source=outdoor"
        } else {
            ""
        };
        let url = format!(
            "{API_ROOT}/streetview?location={location}&size={size}&heading={heading}&fov={fov}&pitch={pitch}&radius={radius}{source}&key={key}",
            size = spec.size,
            heading = spec.heading,
            fov = spec.fov,
            pitch = spec.pitch,
            radius = spec.search_radius_m,
            key = self.api_key,
        );
        self.maybe_sign(url)
    }

    /// Static map endpoint for overhead satellite tiles. Signed when a
    /// secret is set.
    pub fn static_map_url(
        &self,
        center: &Location,
        zoom: u8,
        size: ImageSize,
        scale: u8,
        format: ImageFormat,
    ) -> Result<String, RequestError> {
        let url = format!(
            "{API_ROOT}/staticmap?center={center}&zoom={zoom}&size={size}&scale={scale}&format={format}&maptype=satellite&key={key}",
            format = format.as_query_value(),
            key = self.api_key,
        );
        self.maybe_sign(url)
    }

    /// Nearby-search endpoint for one keyword around a center point.
    pub fn nearby_search_url(
        &self,
        center: &Location,
        radius_m: u32,
        keyword: Option<&str>,
    ) -> String {
        let keyword = match keyword {
            Some(k) => format!("&keyword={k}"),
            None => String::new(),
        };
        format!(
            "{API_ROOT}/place/nearbysearch/json?location={center}&radius={radius_m}{keyword}&key={key}",
            key = self.api_key,
        )
    }

    /// Follow-up page of a nearby search, addressed purely by token.
    pub fn nearby_search_page_url(&self, page_token: &str) -> String {
        format!(
            "{API_ROOT}/place/nearbysearch/json?pagetoken={page_token}&key={key}",
            key = self.api_key,
        )
    }

    /// Place-details endpoint restricted to the review-bearing fields.
    pub fn place_details_url(&self, place_id: &str) -> String {
        format!(
            "{API_ROOT}/place/details/json?place_id={place_id}&fields=name,place_id,type,review&key={key}",
            key = self.api_key,
        )
    }
}

impl MetadataSource for MapsApi {
    fn metadata_url(&self, candidate: &Location, search_radius_m: u32, outdoor_only: bool) -> String {
        self.street_view_metadata_url(candidate, search_radius_m, outdoor_only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn api() -> MapsApi {
        MapsApi::new("test-key").unwrap()
    }

    fn loc() -> Location {
        Location::new(40.0, -74.0).unwrap()
    }

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(matches!(MapsApi::new(""), Err(RequestError::EmptyApiKey)));
    }

    #[test]
    fn test_metadata_url_shape() {
        let url = api().street_view_metadata_url(&loc(), 10, true);
        assert_eq!(
            url,
            "https://maps.googleapis.com/maps/api/streetview/metadata?\
             location=40,-74&source=outdoor&radius=10&key=test-key"
        );

        let indoor = api().street_view_metadata_url(&loc(), 50, false);
        assert!(!indoor.contains("source=outdoor"));
    }

    #[test]
    fn test_street_view_image_url_unsigned() {
        let spec = StreetViewImageSpec {
            size: ImageSize::square(640),
            heading: 90.0,
            fov: 120,
            pitch: 0.0,
            search_radius_m: 50,
            outdoor_only: true,
        };
        let url = api().street_view_image_url(&loc(), &spec).unwrap();
        assert_eq!(
            url,
            "https://maps.googleapis.com/maps/api/streetview?\
             location=40,-74&size=640x640&heading=90&fov=120&pitch=0\
             &radius=50&source=outdoor&key=test-key"
        );
    }

    #[test]
    fn test_street_view_image_url_signed() {
        // URL-safe base64 of a short secret
        let api = api().with_secret("dGVzdC1zZWNyZXQ=");
        let spec = StreetViewImageSpec {
            size: ImageSize::default(),
            heading: 0.0,
            fov: 120,
            pitch: 0.0,
            search_radius_m: 50,
            outdoor_only: false,
        };
        let url = api.street_view_image_url(&loc(), &spec).unwrap();
        assert!(url.contains("&signature="));
        // The signature goes last, after the key
        assert!(url.find("&key=").unwrap() < url.find("&signature=").unwrap());
    }

    #[test]
    fn test_static_map_url_shape() {
        let url = api()
            .static_map_url(&loc(), 16, ImageSize::square(640), 1, ImageFormat::Png)
            .unwrap();
        assert_eq!(
            url,
            "https://maps.googleapis.com/maps/api/staticmap?\
             center=40,-74&zoom=16&size=640x640&scale=1&format=png\
             &maptype=satellite&key=test-key"
        );
    }

    #[test]
    fn test_places_urls() {
        let url = api().nearby_search_url(&loc(), 1000, Some("cafe"));
        assert_eq!(
            url,
            "https://maps.googleapis.com/maps/api/place/nearbysearch/json?\
             location=40,-74&radius=1000&keyword=cafe&key=test-key"
        );

        let url = api().nearby_search_page_url("tok123");
        assert!(url.contains("pagetoken=tok123"));
        assert!(!url.contains("location="));

        let url = api().place_details_url("ChIJabc");
        assert!(url.contains("place_id=ChIJabc"));
        assert!(url.contains("fields=name,place_id,type,review"));
    }

    #[test]
    fn test_heading_modes() {
        let anchor = loc();
        let candidate = Location::new(40.0, -74.01).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        assert_eq!(
            HeadingMode::Fixed(180.0).resolve(candidate, anchor, &mut rng),
            180.0
        );

        let random = HeadingMode::Random.resolve(candidate, anchor, &mut rng);
        assert!((0.0..360.0).contains(&random));

        // The anchor sits due east of the candidate
        let toward = HeadingMode::TowardAnchor.resolve(candidate, anchor, &mut rng);
        assert!((toward - 90.0).abs() < 1.0, "heading was {toward}");
    }

    #[test]
    fn test_image_size_parse_and_display() {
        let size: ImageSize = "400x300".parse().unwrap();
        assert_eq!(size.width, 400);
        assert_eq!(size.height, 300);
        assert_eq!(size.to_string(), "400x300");
        assert!("400".parse::<ImageSize>().is_err());
        assert!("axb".parse::<ImageSize>().is_err());
    }
}
