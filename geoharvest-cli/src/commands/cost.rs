//! Cost command - estimate API spend for a planned or finished run.

use std::path::PathBuf;

use clap::Args;
use geoharvest::cost::{count_api_calls, estimate, PriceTable};

use crate::error::CliError;

/// Arguments for the cost command.
#[derive(Debug, Args)]
pub struct CostArgs {
    /// Number of anchor locations the run covers
    #[arg(long)]
    pub locations: usize,

    /// Derive satellite call counts from this retrieval directory
    #[arg(long)]
    pub satellite_dir: Option<PathBuf>,

    /// Derive nearby-search call counts from this retrieval directory
    #[arg(long)]
    pub nearby_dir: Option<PathBuf>,

    /// Derive street view call counts from this retrieval directory
    #[arg(long)]
    pub street_view_dir: Option<PathBuf>,

    /// Derive place-details call counts from this retrieval directory
    #[arg(long)]
    pub reviews_dir: Option<PathBuf>,

    /// Static map calls per location, overriding any derived count
    #[arg(long)]
    pub static_maps: Option<f64>,

    /// Nearby-search calls per location, overriding any derived count
    #[arg(long)]
    pub nearby_search: Option<f64>,

    /// Street view image calls per location, overriding any derived count
    #[arg(long)]
    pub street_view: Option<f64>,

    /// Place-details calls per location, overriding any derived count
    #[arg(long)]
    pub place_details: Option<f64>,

    /// Fixed amount added to the total, e.g. a recurring credit as a
    /// negative value
    #[arg(long, default_value_t = 0.0)]
    pub extra_expense: f64,
}

/// Run the cost command.
pub fn run(args: CostArgs) -> Result<(), CliError> {
    let mut counts = count_api_calls(
        args.locations,
        args.satellite_dir.as_deref(),
        args.nearby_dir.as_deref(),
        args.street_view_dir.as_deref(),
        args.reviews_dir.as_deref(),
    )?;

    if let Some(n) = args.static_maps {
        counts.static_maps = n;
    }
    if let Some(n) = args.nearby_search {
        counts.nearby_search = n;
    }
    if let Some(n) = args.street_view {
        counts.static_street_view = n;
    }
    if let Some(n) = args.place_details {
        counts.places_details = n;
    }

    let breakdown = estimate(args.locations, &PriceTable::default(), &counts, args.extra_expense)?;

    println!("Estimated cost for {} locations:", args.locations);
    print_line("Static maps", counts.static_maps, breakdown.static_maps);
    print_line("Nearby search", counts.nearby_search, breakdown.nearby_search);
    print_line(
        "Street view",
        counts.static_street_view,
        breakdown.static_street_view,
    );
    print_line("Place details", counts.places_details, breakdown.places_details);
    if args.extra_expense != 0.0 {
        println!("  {:<14} {:>24}${:.2}", "Extra", "", args.extra_expense);
    }
    println!("  {:<14} {:>24}${:.2}", "Total", "", breakdown.total);
    Ok(())
}

fn print_line(label: &str, calls_per_location: f64, dollars: f64) {
    println!(
        "  {:<14} {:>10.2} calls/location {:>7}${:.2}",
        label, calls_per_location, "", dollars
    );
}
