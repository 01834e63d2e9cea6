//! Satellite command - one overhead image per location at matched coverage.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use geoharvest::config::{RetrievalConfig, SatelliteSettings};
use geoharvest::fetch::{FetchOrchestrator, FetchTask, SatellitePlanner};
use geoharvest::request::ImageFormat;
use geoharvest::retry::CancelFlag;

use super::common::{build_api, build_client, report_outcomes, resolve_api_key};
use crate::error::CliError;
use crate::input::read_locations;
use crate::progress_bar::BarObserver;

/// Arguments for the satellite command.
#[derive(Debug, Args)]
pub struct SatelliteArgs {
    /// CSV file with an `id,location` header; locations are "lat,lon" pairs
    pub input: PathBuf,

    /// Output directory; images land flat as `<id>.<ext>`
    #[arg(long, default_value = "satellite")]
    pub out_dir: PathBuf,

    /// API key (falls back to GOOGLE_MAPS_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// URL-signing secret (falls back to GOOGLE_MAPS_SIGNING_SECRET)
    #[arg(long)]
    pub signing_secret: Option<String>,

    /// Ideal horizontal ground coverage per image, in km
    #[arg(long, default_value_t = 2.0)]
    pub coverage_km: f64,

    /// Horizontal image size in pixels, at most 640
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Render scale factor
    #[arg(long, default_value_t = 1)]
    pub scale: u8,

    /// Image format: png, jpeg or gif
    #[arg(long, default_value = "png")]
    pub format: ImageFormat,

    /// Worker threads; defaults to the available parallelism
    #[arg(long)]
    pub workers: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

/// Run the satellite command.
pub fn run(args: SatelliteArgs, cancel: CancelFlag) -> Result<(), CliError> {
    let locations = read_locations(&args.input)?;

    let api_key = resolve_api_key(args.api_key)?;
    let mut config = RetrievalConfig::new(api_key.clone());
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.validate()?;

    let settings = SatelliteSettings {
        coverage_km: args.coverage_km,
        pixel_width: args.width,
        scale: args.scale,
        format: args.format,
    };

    let api = build_api(api_key, args.signing_secret)?;
    let client = build_client(args.timeout)?;

    let tasks: Vec<FetchTask> = locations
        .into_iter()
        .map(|(id, anchor)| FetchTask {
            key: id,
            anchor,
            dir: args.out_dir.clone(),
            target_count: 1,
        })
        .collect();

    println!(
        "Retrieving satellite images for {} locations at ~{} km coverage",
        tasks.len(),
        args.coverage_km
    );

    let planner = SatellitePlanner::for_tasks(api, settings, &tasks)?;
    let bar = Arc::new(BarObserver::new(tasks.len()));
    let orchestrator = FetchOrchestrator::new(client, planner, config.retry, cancel, config.workers)
        .with_observer(bar.clone());

    let outcomes = orchestrator.run(&tasks)?;
    bar.finish();
    report_outcomes(&outcomes);
    Ok(())
}
