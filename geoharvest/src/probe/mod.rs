//! Imagery availability probing.
//!
//! Before street-level imagery is fetched, each candidate location is
//! checked against the free metadata endpoint. A structurally valid
//! response with status `"OK"` means imagery is available; any other
//! status (`"ZERO_RESULTS"`, `"NOT_FOUND"`, ...) means it is not; that is
//! a normal outcome, not an error.

use crate::geo::Location;
use crate::http::{HttpClient, HttpError};
use crate::retry::{run_with_retry, CancelFlag, RetryError, RetryPolicy};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Builds metadata-endpoint URLs for candidate locations.
///
/// URL construction is endpoint-specific and lives with the request
/// builder; the probe only needs a URL per candidate.
pub trait MetadataSource: Send + Sync {
    fn metadata_url(&self, candidate: &Location, search_radius_m: u32, outdoor_only: bool)
        -> String;
}

/// Errors from availability probing.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The metadata request failed past the retry budget or permanently.
    #[error("metadata request failed: {0}")]
    Request(#[from] RetryError<HttpError>),

    /// The response body was not the expected JSON envelope.
    #[error("malformed metadata response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },
}

impl ProbeError {
    /// Whether the failure was a cancellation request rather than an error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Request(RetryError::Cancelled))
    }
}

/// Minimal response envelope: every metadata response carries a status.
#[derive(Debug, Deserialize)]
struct MetadataEnvelope {
    status: String,
}

/// Availability results for the probed prefix of a candidate batch.
///
/// When a probe batch short-circuits at its limit, candidates after the
/// short-circuit point are never probed, so `results` covers only the
/// probed prefix; callers must not assume one entry per input candidate.
/// [`BatchAvailability::probed`] makes the prefix length explicit.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchAvailability {
    /// Per-candidate availability, in input order, for the probed prefix.
    pub results: Vec<bool>,
}

impl BatchAvailability {
    /// Number of candidates actually probed.
    pub fn probed(&self) -> usize {
        self.results.len()
    }

    /// Number of probed candidates that reported availability.
    pub fn available_count(&self) -> usize {
        self.results.iter().filter(|a| **a).count()
    }
}

/// Single-location existence check against the metadata endpoint.
pub struct AvailabilityProbe<C, M>
where
    C: HttpClient,
    M: MetadataSource,
{
    client: C,
    source: M,
    policy: RetryPolicy,
    cancel: CancelFlag,
}

impl<C, M> AvailabilityProbe<C, M>
where
    C: HttpClient,
    M: MetadataSource,
{
    pub fn new(client: C, source: M, policy: RetryPolicy, cancel: CancelFlag) -> Self {
        Self {
            client,
            source,
            policy,
            cancel,
        }
    }

    /// Checks whether imagery exists near `candidate`.
    ///
    /// Transient transport failures are retried under the probe's policy;
    /// a non-`"OK"` status is reported as `Ok(false)`.
    pub fn check(
        &self,
        candidate: &Location,
        search_radius_m: u32,
        outdoor_only: bool,
    ) -> Result<bool, ProbeError> {
        let url = self
            .source
            .metadata_url(candidate, search_radius_m, outdoor_only);

        let body = run_with_retry(&self.policy, &self.cancel, || self.client.get(&url))?;

        let envelope: MetadataEnvelope =
            serde_json::from_slice(&body).map_err(|e| ProbeError::MalformedResponse {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        debug!(candidate = %candidate, status = %envelope.status, "availability probe");
        Ok(envelope.status == "OK")
    }

    /// Probes candidates in order, short-circuiting once `limit` available
    /// results have been found.
    ///
    /// Returns availability for the probed prefix only (see
    /// [`BatchAvailability`]). With `limit = None` every candidate is
    /// probed.
    pub fn check_batch(
        &self,
        candidates: &[Location],
        search_radius_m: u32,
        outdoor_only: bool,
        limit: Option<usize>,
    ) -> Result<BatchAvailability, ProbeError> {
        let limit = limit.unwrap_or(candidates.len());
        let mut results = Vec::with_capacity(candidates.len());
        let mut found = 0;

        for candidate in candidates {
            if found >= limit {
                break;
            }
            let available = self.check(candidate, search_radius_m, outdoor_only)?;
            results.push(available);
            if available {
                found += 1;
            }
        }

        Ok(BatchAvailability { results })
    }
}
