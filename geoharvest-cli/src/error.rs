//! CLI error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("missing API key: pass --api-key or set GOOGLE_MAPS_API_KEY")]
    MissingApiKey,

    #[error("failed to initialize logging: {0}")]
    Logging(std::io::Error),

    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] geoharvest::config::ConfigError),

    #[error(transparent)]
    Request(#[from] geoharvest::request::RequestError),

    #[error(transparent)]
    Http(#[from] geoharvest::http::HttpError),

    #[error(transparent)]
    Fetch(#[from] geoharvest::fetch::FetchError),

    #[error(transparent)]
    Places(#[from] geoharvest::places::PlacesError),

    #[error(transparent)]
    Cost(#[from] geoharvest::cost::CostError),
}
