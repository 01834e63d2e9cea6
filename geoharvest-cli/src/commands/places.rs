//! Places command - nearby search results around anchor points.

use std::path::PathBuf;

use clap::Args;
use geoharvest::config::PlacesSettings;
use geoharvest::places::{flatten_nearby_csv, PlacesRetriever, DEFAULT_PLACE_TYPES};
use geoharvest::retry::{CancelFlag, RetryPolicy};

use super::common::{build_api, build_client, resolve_api_key};
use crate::error::CliError;
use crate::input::read_locations;

/// Arguments for the places command.
#[derive(Debug, Args)]
pub struct PlacesArgs {
    /// CSV file with an `id,location` header; locations are "lat,lon" pairs
    pub input: PathBuf,

    /// Output directory; one sub-directory of keyword JSON files per ID
    #[arg(long, default_value = "nearby_places")]
    pub out_dir: PathBuf,

    /// API key (falls back to GOOGLE_MAPS_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Search radius around each location, in km
    #[arg(long, default_value_t = 1.0)]
    pub radius_km: f64,

    /// Keywords to search; repeat the flag for each. Defaults to the
    /// built-in place-type list
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    /// Also flatten the saved JSON into a single CSV
    #[arg(long)]
    pub csv: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

/// Run the places command.
pub fn run(args: PlacesArgs, cancel: CancelFlag) -> Result<(), CliError> {
    let locations = read_locations(&args.input)?;

    let api_key = resolve_api_key(args.api_key)?;
    let api = build_api(api_key, None)?;
    let client = build_client(args.timeout)?;

    let settings = PlacesSettings {
        radius_km: args.radius_km,
        keywords: if args.keywords.is_empty() {
            None
        } else {
            Some(args.keywords.clone())
        },
    };
    settings.validate()?;

    let keyword_count = settings
        .keywords
        .as_ref()
        .map_or(DEFAULT_PLACE_TYPES.len(), Vec::len);
    println!(
        "Searching {} keywords around {} locations",
        keyword_count,
        locations.len()
    );

    let retriever = PlacesRetriever::new(client, api, RetryPolicy::default(), cancel);
    let summary = retriever.retrieve_nearby(&args.out_dir, &locations, &settings)?;

    println!(
        "Saved {} responses, skipped {} existing, {} failed",
        summary.saved, summary.skipped, summary.failed
    );
    if summary.cancelled {
        println!("Cancelled before finishing; rerun to resume");
        return Ok(());
    }

    if args.csv {
        let keywords: Vec<&str> = match &settings.keywords {
            Some(list) => list.iter().map(String::as_str).collect(),
            None => DEFAULT_PLACE_TYPES.to_vec(),
        };
        let path = flatten_nearby_csv(&args.out_dir, &keywords)?;
        println!("Flattened results to {}", path.display());
    }
    Ok(())
}
