//! Zoom level selection for fixed-footprint imagery.
//!
//! Given a set of latitudes, an ideal ground coverage and an image pixel
//! width, picks for each latitude the integer zoom level whose achieved
//! coverage is closest to the ideal.

use crate::geo::meters_per_pixel;
use thiserror::Error;

/// Lowest zoom level the imagery endpoint accepts.
pub const MIN_ZOOM: u8 = 0;

/// Highest zoom level the imagery endpoint accepts.
pub const MAX_ZOOM: u8 = 21;

/// Errors from zoom selection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ZoomError {
    /// Latitude outside [-90, 90].
    #[error("invalid latitude {0}: must be within [-90, 90]")]
    InvalidLatitude(f64),

    /// Ideal coverage or pixel width was not positive.
    #[error("coverage and pixel width must be positive (coverage {coverage_km} km, {pixel_width} px)")]
    InvalidSpec { coverage_km: f64, pixel_width: u32 },

    /// No zoom level in [MIN_ZOOM, MAX_ZOOM] brackets the ideal coverage.
    #[error("no zoom in [{MIN_ZOOM}, {MAX_ZOOM}] brackets coverage {ideal_km} km at latitude {latitude}")]
    CoverageNotBracketed { latitude: f64, ideal_km: f64 },
}

/// A selected zoom level and the ground coverage it actually achieves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomResult {
    /// Selected zoom level.
    pub zoom: u8,
    /// Achieved horizontal coverage in kilometers.
    pub coverage_km: f64,
}

/// Horizontal ground coverage in km of a `pixel_width`-wide image at
/// `lat` / `zoom`.
fn coverage_km(lat: f64, zoom: u8, pixel_width: u32) -> f64 {
    meters_per_pixel(lat, zoom) * pixel_width as f64 / 1000.0
}

/// Selects the best zoom level for each latitude.
///
/// For every latitude the two candidate zooms are the first one whose
/// coverage drops to or below `ideal_coverage_km` and the zoom just above it
/// (coverage still larger than ideal). The winner is the candidate closer to
/// the ideal by squared coverage ratio; an exact tie resolves to the
/// coarser, larger-coverage zoom.
///
/// Latitudes are processed in order of increasing `cos(lat)` so that the
/// bracketing zoom never decreases between iterations: each scan restarts
/// one level below the previous result instead of at zero. This is purely
/// an optimization; results match a full scan.
///
/// The output is in the same order as the input.
pub fn select_zoom_levels(
    latitudes: &[f64],
    ideal_coverage_km: f64,
    pixel_width: u32,
) -> Result<Vec<ZoomResult>, ZoomError> {
    if !(ideal_coverage_km.is_finite() && ideal_coverage_km > 0.0) || pixel_width == 0 {
        return Err(ZoomError::InvalidSpec {
            coverage_km: ideal_coverage_km,
            pixel_width,
        });
    }
    for &lat in latitudes {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ZoomError::InvalidLatitude(lat));
        }
    }

    // Coverage scales with cos(lat), so ordering by cos(lat) ascending makes
    // the selected zoom monotone non-decreasing across iterations.
    let mut order: Vec<usize> = (0..latitudes.len()).collect();
    order.sort_by(|&a, &b| {
        let ca = latitudes[a].to_radians().cos();
        let cb = latitudes[b].to_radians().cos();
        ca.total_cmp(&cb)
    });

    let mut results = vec![
        ZoomResult {
            zoom: 0,
            coverage_km: 0.0
        };
        latitudes.len()
    ];

    let mut scan_from = MIN_ZOOM;
    for index in order {
        let lat = latitudes[index];
        let selected = select_for_latitude(lat, ideal_coverage_km, pixel_width, scan_from)?;
        scan_from = selected.zoom.saturating_sub(1);
        results[index] = selected;
    }

    Ok(results)
}

/// Scans upward from `start` for the bracketing pair at one latitude.
fn select_for_latitude(
    lat: f64,
    ideal_km: f64,
    pixel_width: u32,
    start: u8,
) -> Result<ZoomResult, ZoomError> {
    // Back off until the starting zoom is still on the too-large side,
    // otherwise the bracket below would be missed.
    let mut start = start;
    while start > MIN_ZOOM && coverage_km(lat, start, pixel_width) <= ideal_km {
        start -= 1;
    }

    let mut larger: Option<(u8, f64)> = None;
    for zoom in start..=MAX_ZOOM {
        let coverage = coverage_km(lat, zoom, pixel_width);
        if coverage > ideal_km {
            larger = Some((zoom, coverage));
            continue;
        }

        // First zoom at or below the ideal; the previous one is the
        // larger-coverage side of the bracket.
        let (larger_zoom, larger_coverage) = larger.ok_or(ZoomError::CoverageNotBracketed {
            latitude: lat,
            ideal_km,
        })?;

        let smaller_ratio = (ideal_km / coverage).powi(2);
        let larger_ratio = (larger_coverage / ideal_km).powi(2);

        // Ties go to the coarser (larger-coverage) zoom.
        return Ok(if larger_ratio <= smaller_ratio {
            ZoomResult {
                zoom: larger_zoom,
                coverage_km: larger_coverage,
            }
        } else {
            ZoomResult {
                zoom,
                coverage_km: coverage,
            }
        });
    }

    // Even MAX_ZOOM covers more ground than the ideal.
    Err(ZoomError::CoverageNotBracketed {
        latitude: lat,
        ideal_km,
    })
}
