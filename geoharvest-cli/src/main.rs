//! geoharvest - bulk retrieval of geotagged imagery and place metadata.

mod commands;
mod error;
mod input;
mod progress_bar;

use clap::{Parser, Subcommand};
use geoharvest::logging::{self, DEFAULT_LOG_DIR, DEFAULT_LOG_FILE};
use geoharvest::retry::CancelFlag;
use tracing::info;

use commands::{cost, places, reviews, satellite, street_view};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "geoharvest", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Retrieve street-level images sampled around each location
    StreetView(street_view::StreetViewArgs),
    /// Retrieve one overhead satellite image per location
    Satellite(satellite::SatelliteArgs),
    /// Retrieve nearby-search place metadata around each location
    Places(places::PlacesArgs),
    /// Retrieve place-details reviews for a list of place IDs
    Reviews(reviews::ReviewsArgs),
    /// Estimate API spend for a planned or finished run
    Cost(cost::CostArgs),
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let _guard = logging::init(DEFAULT_LOG_DIR, DEFAULT_LOG_FILE).map_err(CliError::Logging)?;
    info!(version = geoharvest::VERSION, "geoharvest starting");

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted; finishing in-flight requests");
        handler_flag.cancel();
    })?;

    match cli.command {
        Commands::StreetView(args) => street_view::run(args, cancel),
        Commands::Satellite(args) => satellite::run(args, cancel),
        Commands::Places(args) => places::run(args, cancel),
        Commands::Reviews(args) => reviews::run(args, cancel),
        Commands::Cost(args) => cost::run(args),
    }
}
