//! Common argument handling shared across CLI commands.

use std::time::Duration;

use geoharvest::http::ReqwestClient;
use geoharvest::request::{HeadingMode, MapsApi};

use crate::error::CliError;

/// Environment variable consulted when `--api-key` is absent.
pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

/// Environment variable consulted when `--signing-secret` is absent.
pub const SIGNING_SECRET_ENV: &str = "GOOGLE_MAPS_SIGNING_SECRET";

/// Resolves the API key: CLI flag first, then environment.
pub fn resolve_api_key(flag: Option<String>) -> Result<String, CliError> {
    match flag {
        Some(key) if !key.is_empty() => Ok(key),
        _ => std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(CliError::MissingApiKey),
    }
}

/// Builds the API endpoint factory, attaching a signing secret when one
/// is available from the flag or environment.
pub fn build_api(api_key: String, secret_flag: Option<String>) -> Result<MapsApi, CliError> {
    let api = MapsApi::new(api_key)?;
    let secret = secret_flag.or_else(|| std::env::var(SIGNING_SECRET_ENV).ok());
    match secret.filter(|s| !s.is_empty()) {
        Some(secret) => Ok(api.with_secret(secret)),
        None => Ok(api),
    }
}

/// Builds the blocking HTTP client with the given per-request timeout.
pub fn build_client(timeout_secs: u64) -> Result<ReqwestClient, CliError> {
    Ok(ReqwestClient::with_timeout(Duration::from_secs(
        timeout_secs,
    ))?)
}

/// Prints a per-status tally for a finished retrieval run.
pub fn report_outcomes(outcomes: &[geoharvest::fetch::FetchOutcome]) {
    use geoharvest::fetch::TaskStatus;

    let mut completed = 0usize;
    let mut skipped = 0usize;
    let mut partial = 0usize;
    let mut failed = 0usize;
    let mut cancelled = 0usize;
    let mut written = 0usize;

    for outcome in outcomes {
        written += outcome.written;
        match &outcome.status {
            TaskStatus::Completed => completed += 1,
            TaskStatus::Skipped => skipped += 1,
            TaskStatus::Partial { .. } => partial += 1,
            TaskStatus::Failed(_) => failed += 1,
            TaskStatus::Cancelled => cancelled += 1,
        }
    }

    println!("Downloaded {} images", written);
    println!(
        "  Locations: {} complete, {} skipped, {} partial, {} failed",
        completed, skipped, partial, failed
    );
    if cancelled > 0 {
        println!("  Cancelled before finishing: {}", cancelled);
    }
    for outcome in outcomes {
        match &outcome.status {
            TaskStatus::Failed(reason) => println!("  {}: {}", outcome.key, reason),
            TaskStatus::Partial {
                requested,
                delivered,
            } => println!(
                "  {}: only {}/{} images available",
                outcome.key, delivered, requested
            ),
            _ => {}
        }
    }
}

/// Parses a heading argument: `random`, `toward-anchor`, or a fixed
/// compass bearing in degrees.
pub fn parse_heading(value: &str) -> Result<HeadingMode, String> {
    match value {
        "random" => Ok(HeadingMode::Random),
        "toward-anchor" => Ok(HeadingMode::TowardAnchor),
        other => {
            let degrees: f64 = other
                .parse()
                .map_err(|_| format!("expected 'random', 'toward-anchor' or degrees, got '{other}'"))?;
            if !(0.0..360.0).contains(&degrees) {
                return Err(format!("heading must be within [0, 360), got {degrees}"));
            }
            Ok(HeadingMode::Fixed(degrees))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_heading_modes() {
        assert!(matches!(parse_heading("random"), Ok(HeadingMode::Random)));
        assert!(matches!(
            parse_heading("toward-anchor"),
            Ok(HeadingMode::TowardAnchor)
        ));
        assert!(matches!(
            parse_heading("90"),
            Ok(HeadingMode::Fixed(d)) if (d - 90.0).abs() < 1e-9
        ));
        assert!(parse_heading("north").is_err());
        assert!(parse_heading("360").is_err());
    }
}
