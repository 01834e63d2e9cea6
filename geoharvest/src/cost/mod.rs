//! Pre-run cost estimation for the metered endpoints.
//!
//! Pure arithmetic over a tiered price table: every API is billed per
//! 1000 calls, with the rate dropping once the monthly call count passes
//! a threshold. Call counts can be given directly or derived from a
//! previous retrieval directory.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CostError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("price table row {api} has {got} bands, expected {expected}")]
    MalformedTable {
        api: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("location count must be at least 1")]
    NoLocations,

    #[error("unreadable retrieval data at {path}: {reason}")]
    MalformedData { path: PathBuf, reason: String },
}

/// Per-1000-call prices in USD, one entry per billing band.
///
/// `thresholds[i]` is the call count where band `i` starts; band `i`
/// covers calls up to the next threshold. The default matches the
/// published May 2020 prices: a single break at 100 000 calls.
#[derive(Debug, Clone)]
pub struct PriceTable {
    pub thresholds: Vec<f64>,
    pub static_maps: Vec<f64>,
    pub nearby_search: Vec<f64>,
    pub static_street_view: Vec<f64>,
    pub places_details: Vec<f64>,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            thresholds: vec![0.0, 100_000.0],
            static_maps: vec![2.0, 1.6],
            nearby_search: vec![40.0, 32.0],
            static_street_view: vec![7.0, 5.6],
            places_details: vec![22.0, 17.6],
        }
    }
}

impl PriceTable {
    fn validate(&self) -> Result<(), CostError> {
        let expected = self.thresholds.len();
        for (api, row) in [
            ("static_maps", &self.static_maps),
            ("nearby_search", &self.nearby_search),
            ("static_street_view", &self.static_street_view),
            ("places_details", &self.places_details),
        ] {
            if row.len() != expected {
                return Err(CostError::MalformedTable {
                    api,
                    got: row.len(),
                    expected,
                });
            }
        }
        Ok(())
    }
}

/// Expected API calls per location, by endpoint.
///
/// Metadata probes are free and deliberately absent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ApiCallCounts {
    pub static_maps: f64,
    pub nearby_search: f64,
    pub static_street_view: f64,
    pub places_details: f64,
}

/// Estimated spend in USD, per endpoint and in total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    pub static_maps: f64,
    pub nearby_search: f64,
    pub static_street_view: f64,
    pub places_details: f64,
    pub total: f64,
}

/// Prices `calls_per_location * n_locations` calls against the table.
///
/// `extra_expense` is added to the total unconditionally; a negative
/// value models a recurring credit.
pub fn estimate(
    n_locations: usize,
    table: &PriceTable,
    calls_per_location: &ApiCallCounts,
    extra_expense: f64,
) -> Result<CostBreakdown, CostError> {
    if n_locations == 0 {
        return Err(CostError::NoLocations);
    }
    table.validate()?;

    let n = n_locations as f64;
    let static_maps = band_price(calls_per_location.static_maps * n, &table.thresholds, &table.static_maps);
    let nearby_search = band_price(
        calls_per_location.nearby_search * n,
        &table.thresholds,
        &table.nearby_search,
    );
    let static_street_view = band_price(
        calls_per_location.static_street_view * n,
        &table.thresholds,
        &table.static_street_view,
    );
    let places_details = band_price(
        calls_per_location.places_details * n,
        &table.thresholds,
        &table.places_details,
    );

    Ok(CostBreakdown {
        static_maps,
        nearby_search,
        static_street_view,
        places_details,
        total: static_maps + nearby_search + static_street_view + places_details + extra_expense,
    })
}

/// Splits `n_calls` into per-band counts and prices each band.
fn band_price(n_calls: f64, thresholds: &[f64], prices_per_1000: &[f64]) -> f64 {
    let mut by_band: Vec<f64> = thresholds
        .iter()
        .map(|t| (n_calls - t).max(0.0))
        .collect();
    for i in 0..by_band.len().saturating_sub(1) {
        by_band[i] -= by_band[i + 1];
    }
    by_band
        .iter()
        .zip(prices_per_1000)
        .map(|(calls, price)| calls * price / 1000.0)
        .sum()
}

/// Derives per-location call counts from retrieval directories.
///
/// - `satellite_dir`: artifact count divided by locations.
/// - `nearby_dir`: one call per started page of 20 results, plus one per
///   empty result set, summed over all saved keyword files.
/// - `street_view_dir`: mean artifact count across location sub-dirs.
/// - `reviews_dir`: JSON file count divided by locations.
///
/// Any directory may be `None`, leaving that count at zero.
pub fn count_api_calls(
    n_locations: usize,
    satellite_dir: Option<&Path>,
    nearby_dir: Option<&Path>,
    street_view_dir: Option<&Path>,
    reviews_dir: Option<&Path>,
) -> Result<ApiCallCounts, CostError> {
    if n_locations == 0 {
        return Err(CostError::NoLocations);
    }
    let n = n_locations as f64;
    let mut counts = ApiCallCounts::default();

    if let Some(dir) = satellite_dir {
        counts.static_maps = count_files(dir, |name| !name.ends_with(".csv"))? as f64 / n;
    }
    if let Some(dir) = nearby_dir {
        counts.nearby_search = count_nearby_calls(dir)? / n;
    }
    if let Some(dir) = street_view_dir {
        let mut images = 0usize;
        let mut sub_dirs = 0usize;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                sub_dirs += 1;
                images += count_files(&path, |name| !name.ends_with(".csv"))?;
            }
        }
        if sub_dirs > 0 {
            counts.static_street_view = images as f64 / sub_dirs as f64;
        }
    }
    if let Some(dir) = reviews_dir {
        counts.places_details = count_files(dir, |name| name.ends_with(".json"))? as f64 / n;
    }
    Ok(counts)
}

fn count_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<usize, CostError> {
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_file()
            && entry.file_name().to_str().map(&keep).unwrap_or(false)
        {
            count += 1;
        }
    }
    Ok(count)
}

/// Nearby search bills one request per page of up to 20 results; a
/// zero-result search still costs one request.
fn count_nearby_calls(dir: &Path) -> Result<f64, CostError> {
    let mut calls = 0.0;
    for entry in std::fs::read_dir(dir)? {
        let sub_dir = entry?.path();
        if !sub_dir.is_dir() {
            continue;
        }
        for file in std::fs::read_dir(&sub_dir)? {
            let path = file?.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let bytes = std::fs::read(&path)?;
            let value: serde_json::Value =
                serde_json::from_slice(&bytes).map_err(|e| CostError::MalformedData {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            let results = value
                .get("results")
                .and_then(serde_json::Value::as_array)
                .map(Vec::len)
                .unwrap_or(0);
            if results == 0 {
                calls += 1.0;
            } else {
                calls += (results as f64 / 20.0).ceil();
            }
        }
    }
    Ok(calls)
}
