//! Reviews command - place-details reviews for a list of place IDs.

use std::path::PathBuf;

use clap::Args;
use geoharvest::places::{flatten_reviews_csv, PlacesRetriever};
use geoharvest::retry::{CancelFlag, RetryPolicy};

use super::common::{build_api, build_client, resolve_api_key};
use crate::error::CliError;
use crate::input::read_place_ids;

/// Arguments for the reviews command.
#[derive(Debug, Args)]
pub struct ReviewsArgs {
    /// Text file with one place ID per line
    pub input: PathBuf,

    /// Output directory; one JSON file per place ID
    #[arg(long, default_value = "reviews")]
    pub out_dir: PathBuf,

    /// API key (falls back to GOOGLE_MAPS_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Also flatten the saved reviews into a single CSV
    #[arg(long)]
    pub csv: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

/// Run the reviews command.
pub fn run(args: ReviewsArgs, cancel: CancelFlag) -> Result<(), CliError> {
    let place_ids = read_place_ids(&args.input)?;

    let api_key = resolve_api_key(args.api_key)?;
    let api = build_api(api_key, None)?;
    let client = build_client(args.timeout)?;

    println!("Retrieving reviews for {} places", place_ids.len());

    let retriever = PlacesRetriever::new(client, api, RetryPolicy::default(), cancel);
    let summary = retriever.retrieve_reviews(&args.out_dir, &place_ids)?;

    println!(
        "Saved {} responses, skipped {} existing, {} failed",
        summary.saved, summary.skipped, summary.failed
    );
    if summary.cancelled {
        println!("Cancelled before finishing; rerun to resume");
        return Ok(());
    }

    if args.csv {
        let path = flatten_reviews_csv(&args.out_dir)?;
        println!("Flattened reviews to {}", path.display());
    }
    Ok(())
}
