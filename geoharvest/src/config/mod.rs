//! Retrieval settings with validated defaults.
//!
//! Plain structs, no dynamic reconfiguration. Every knob has a default
//! matching typical usage; `validate` is called by the consumers before
//! any network I/O so bad parameters fail fast.

use crate::request::{HeadingMode, ImageFormat, ImageSize};
use crate::retry::RetryPolicy;
use std::thread;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key must not be empty")]
    EmptyApiKey,

    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("field of view must be within (0, 120], got {0}")]
    InvalidFov(u32),

    #[error("pitch must be within [-90, 90], got {0}")]
    InvalidPitch(f64),

    #[error("image dimension must be within [1, 640], got {0}")]
    InvalidImageDimension(u32),
}

fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Shared connection and credential settings.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub api_key: String,
    /// URL-signing secret; imagery URLs go unsigned when absent.
    pub signing_secret: Option<String>,
    /// Worker pool size for per-location tasks.
    pub workers: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl RetrievalConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            signing_secret: None,
            workers: default_workers(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkerCount);
        }
        Ok(())
    }
}

/// Settings for street-level image retrieval.
#[derive(Debug, Clone)]
pub struct StreetViewSettings {
    /// Images to collect per location.
    pub images_per_location: usize,
    /// Radius in km of the disk candidates are drawn from.
    pub radius_km: f64,
    pub heading: HeadingMode,
    /// Horizontal field of view in degrees, at most 120.
    pub fov: u32,
    /// Camera pitch relative to the vehicle.
    pub pitch: f64,
    /// Panorama search radius in meters.
    pub search_radius_m: u32,
    pub outdoor_only: bool,
    pub image_size: ImageSize,
    /// Probe budget multiplier for the rejection sampler.
    pub trial_limit: u32,
}

impl Default for StreetViewSettings {
    fn default() -> Self {
        Self {
            images_per_location: 5,
            radius_km: 1.0,
            heading: HeadingMode::Random,
            fov: 120,
            pitch: 0.0,
            search_radius_m: 10,
            outdoor_only: true,
            image_size: ImageSize::square(640),
            trial_limit: 10,
        }
    }
}

impl StreetViewSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images_per_location == 0 {
            return Err(ConfigError::NonPositive {
                name: "images_per_location",
                value: 0.0,
            });
        }
        if !self.radius_km.is_finite() || self.radius_km <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "radius_km",
                value: self.radius_km,
            });
        }
        if self.fov == 0 || self.fov > 120 {
            return Err(ConfigError::InvalidFov(self.fov));
        }
        if !(-90.0..=90.0).contains(&self.pitch) {
            return Err(ConfigError::InvalidPitch(self.pitch));
        }
        if self.search_radius_m == 0 {
            return Err(ConfigError::NonPositive {
                name: "search_radius_m",
                value: 0.0,
            });
        }
        validate_dimension(self.image_size.width)?;
        validate_dimension(self.image_size.height)?;
        Ok(())
    }
}

/// Settings for overhead satellite image retrieval.
#[derive(Debug, Clone)]
pub struct SatelliteSettings {
    /// Ideal horizontal ground coverage per image, in km.
    pub coverage_km: f64,
    /// Horizontal image size in pixels, at most 640.
    pub pixel_width: u32,
    pub scale: u8,
    pub format: ImageFormat,
}

impl Default for SatelliteSettings {
    fn default() -> Self {
        Self {
            coverage_km: 2.0,
            pixel_width: 640,
            scale: 1,
            format: ImageFormat::Png,
        }
    }
}

impl SatelliteSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.coverage_km.is_finite() || self.coverage_km <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "coverage_km",
                value: self.coverage_km,
            });
        }
        validate_dimension(self.pixel_width)?;
        if self.scale == 0 {
            return Err(ConfigError::NonPositive {
                name: "scale",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Settings for place-metadata retrieval.
#[derive(Debug, Clone)]
pub struct PlacesSettings {
    /// Search radius around each location, in km.
    pub radius_km: f64,
    /// Keywords to search for; `None` uses the built-in place-type list.
    pub keywords: Option<Vec<String>>,
}

impl Default for PlacesSettings {
    fn default() -> Self {
        Self {
            radius_km: 1.0,
            keywords: None,
        }
    }
}

impl PlacesSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.radius_km.is_finite() || self.radius_km <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "radius_km",
                value: self.radius_km,
            });
        }
        Ok(())
    }
}

fn validate_dimension(value: u32) -> Result<(), ConfigError> {
    if value == 0 || value > 640 {
        return Err(ConfigError::InvalidImageDimension(value));
    }
    Ok(())
}
