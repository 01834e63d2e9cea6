//! Street view command - bulk street-level imagery around anchor points.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use geoharvest::config::{RetrievalConfig, StreetViewSettings};
use geoharvest::fetch::{FetchOrchestrator, FetchTask, StreetViewPlanner};
use geoharvest::request::{HeadingMode, ImageSize};
use geoharvest::retry::CancelFlag;

use super::common::{build_api, build_client, parse_heading, report_outcomes, resolve_api_key};
use crate::error::CliError;
use crate::input::read_locations;
use crate::progress_bar::BarObserver;

/// Arguments for the street-view command.
#[derive(Debug, Args)]
pub struct StreetViewArgs {
    /// CSV file with an `id,location` header; locations are "lat,lon" pairs
    pub input: PathBuf,

    /// Output directory; one sub-directory per location ID
    #[arg(long, default_value = "street_view")]
    pub out_dir: PathBuf,

    /// API key (falls back to GOOGLE_MAPS_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// URL-signing secret (falls back to GOOGLE_MAPS_SIGNING_SECRET)
    #[arg(long)]
    pub signing_secret: Option<String>,

    /// Images to collect per location
    #[arg(long, default_value_t = 5)]
    pub images: usize,

    /// Sampling disk radius around each location, in km
    #[arg(long, default_value_t = 1.0)]
    pub radius_km: f64,

    /// Camera heading: 'random', 'toward-anchor', or degrees
    #[arg(long, default_value = "random", value_parser = parse_heading)]
    pub heading: HeadingMode,

    /// Horizontal field of view in degrees, at most 120
    #[arg(long, default_value_t = 120)]
    pub fov: u32,

    /// Camera pitch relative to the vehicle
    #[arg(long, default_value_t = 0.0)]
    pub pitch: f64,

    /// Panorama search radius per candidate, in meters
    #[arg(long, default_value_t = 10)]
    pub search_radius_m: u32,

    /// Accept indoor panoramas as well as outdoor ones
    #[arg(long)]
    pub allow_indoor: bool,

    /// Image size as WxH or a single square side, at most 640
    #[arg(long, default_value = "640x640")]
    pub size: ImageSize,

    /// Probe budget multiplier before a location is declared short
    #[arg(long, default_value_t = 10)]
    pub trial_limit: u32,

    /// Worker threads; defaults to the available parallelism
    #[arg(long)]
    pub workers: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

/// Run the street-view command.
pub fn run(args: StreetViewArgs, cancel: CancelFlag) -> Result<(), CliError> {
    let locations = read_locations(&args.input)?;

    let api_key = resolve_api_key(args.api_key)?;
    let mut config = RetrievalConfig::new(api_key.clone());
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.validate()?;

    let settings = StreetViewSettings {
        images_per_location: args.images,
        radius_km: args.radius_km,
        heading: args.heading,
        fov: args.fov,
        pitch: args.pitch,
        search_radius_m: args.search_radius_m,
        outdoor_only: !args.allow_indoor,
        image_size: args.size,
        trial_limit: args.trial_limit,
    };

    let api = build_api(api_key, args.signing_secret)?;
    let client = build_client(args.timeout)?;

    let tasks: Vec<FetchTask> = locations
        .into_iter()
        .map(|(id, anchor)| FetchTask {
            dir: args.out_dir.join(&id),
            key: id,
            anchor,
            target_count: args.images,
        })
        .collect();

    println!(
        "Retrieving up to {} street view images for {} locations",
        args.images,
        tasks.len()
    );
    if api.has_secret() {
        println!("Image URLs will be signed");
    }

    let planner = StreetViewPlanner::new(
        client.clone(),
        api,
        settings,
        config.retry.clone(),
        cancel.clone(),
    )?;
    let observer = BarObserver::new(tasks.len());
    let bar = Arc::new(observer);
    let orchestrator = FetchOrchestrator::new(client, planner, config.retry, cancel, config.workers)
        .with_observer(bar.clone());

    let outcomes = orchestrator.run(&tasks)?;
    bar.finish();
    report_outcomes(&outcomes);
    Ok(())
}
