//! GeoHarvest - bulk retrieval of geotagged imagery and place metadata
//!
//! This library acquires street-level and satellite imagery plus place
//! metadata from a remote mapping service for a list of anchor locations,
//! persisting results to a local artifact store. It minimizes redundant
//! requests by resuming from what is already on disk and tolerates an
//! unreliable network with bounded, cancellation-aware retries.
//!
//! # Core pipeline
//!
//! ```ignore
//! use geoharvest::config::RetrievalConfig;
//! use geoharvest::fetch::{FetchOrchestrator, FetchTask, StreetViewPlanner};
//! use geoharvest::http::ReqwestClient;
//!
//! let config = RetrievalConfig::new("API_KEY");
//! let client = ReqwestClient::new()?;
//! let planner = StreetViewPlanner::new(client.clone(), api, settings, config.retry.clone(), cancel.clone())?;
//! let orchestrator = FetchOrchestrator::new(client, planner, config.retry, cancel, config.workers);
//! let outcomes = orchestrator.run(&tasks)?;
//! ```

pub mod config;
pub mod cost;
pub mod fetch;
pub mod geo;
pub mod http;
pub mod logging;
pub mod places;
pub mod probe;
pub mod progress;
pub mod request;
pub mod retry;
pub mod sampler;
pub mod signer;
pub mod zoom;

/// Version of the GeoHarvest library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
