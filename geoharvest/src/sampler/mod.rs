//! Availability-gated rejection sampling of candidate locations.
//!
//! For each target the sampler draws random offsets inside a disk around
//! the anchor, probes the metadata endpoint for imagery availability, and
//! accumulates accepted candidates until it has the requested count or the
//! trial budget is spent. A shortfall is an explicit, reported outcome;
//! points are never fabricated to pad the result.

use crate::geo::{destination, Location};
use crate::http::HttpClient;
use crate::probe::{AvailabilityProbe, MetadataSource, ProbeError};
use rand::Rng;
use std::f64::consts::PI;
use thiserror::Error;
use tracing::{debug, warn};

/// Over-generation factor per sampling round.
///
/// Each round draws `ceil(deficit * CANDIDATE_MULTIPLIER)` candidates so a
/// round with a typical rejection rate can still complete the target.
pub const CANDIDATE_MULTIPLIER: f64 = 1.5;

/// Default trial budget multiplier: sampling stops once
/// `count * trial_limit` candidates have been probed.
pub const DEFAULT_TRIAL_LIMIT: u32 = 10;

/// Errors from candidate sampling.
#[derive(Debug, Error)]
pub enum SampleError {
    /// Target parameters failed validation before any network I/O.
    #[error("invalid sample target {key:?}: {reason}")]
    InvalidTarget { key: String, reason: String },

    /// A probe failed past its retry budget.
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

impl SampleError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Probe(e) if e.is_cancelled())
    }
}

/// One location to sample candidates for.
///
/// Created per input row, consumed once by [`CandidateSampler::sample`].
#[derive(Debug, Clone)]
pub struct SampleTarget {
    /// Opaque identifying key (drives directory naming and log context).
    pub key: String,
    /// Anchor location candidates are drawn around.
    pub anchor: Location,
    /// Number of valid candidate locations requested.
    pub count: usize,
    /// Disk radius in km within which candidates are drawn.
    pub radius_km: f64,
    /// Metadata search radius in meters around each candidate.
    pub search_radius_m: u32,
    /// Restrict the availability search to outdoor imagery.
    pub outdoor_only: bool,
}

/// Accepted candidates for one target, in insertion order of acceptance.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    accepted: Vec<Location>,
    requested: usize,
    probed: usize,
}

impl CandidateSet {
    /// Accepted locations, at most `requested` of them.
    pub fn locations(&self) -> &[Location] {
        &self.accepted
    }

    /// Number of locations originally requested.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Total candidates probed across all rounds.
    pub fn probed(&self) -> usize {
        self.probed
    }

    /// How many locations short of the request this set is.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.accepted.len())
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }
}

/// Rejection sampler producing validated candidate locations per target.
pub struct CandidateSampler<C, M>
where
    C: HttpClient,
    M: MetadataSource,
{
    probe: AvailabilityProbe<C, M>,
    trial_limit: u32,
}

impl<C, M> CandidateSampler<C, M>
where
    C: HttpClient,
    M: MetadataSource,
{
    pub fn new(probe: AvailabilityProbe<C, M>) -> Self {
        Self {
            probe,
            trial_limit: DEFAULT_TRIAL_LIMIT,
        }
    }

    /// Overrides the trial budget multiplier (default 10).
    pub fn with_trial_limit(mut self, trial_limit: u32) -> Self {
        self.trial_limit = trial_limit;
        self
    }

    /// Finds up to `target.count` available locations around the anchor.
    ///
    /// The random source is injected so tests can seed it; production
    /// callers pass `rand::rng()`.
    pub fn sample<R: Rng>(
        &self,
        target: &SampleTarget,
        rng: &mut R,
    ) -> Result<CandidateSet, SampleError> {
        validate_target(target)?;

        // Bounded accumulator: capacity is known up front and acceptance
        // past `count` is truncated by index, never grown.
        let mut accepted: Vec<Location> = Vec::with_capacity(target.count);
        let mut probed_total: usize = 0;
        let budget = target.count * self.trial_limit as usize;

        loop {
            let deficit = target.count - accepted.len();
            let batch_size = ((deficit as f64 * CANDIDATE_MULTIPLIER).ceil() as usize).max(1);
            let candidates = draw_candidates(target, batch_size, rng)?;

            let batch = self.probe.check_batch(
                &candidates,
                target.search_radius_m,
                target.outdoor_only,
                Some(deficit),
            )?;
            probed_total += batch.probed();

            for (candidate, available) in candidates.iter().zip(&batch.results) {
                if *available && accepted.len() < target.count {
                    accepted.push(*candidate);
                }
            }
            accepted.truncate(target.count);

            debug!(
                key = %target.key,
                accepted = accepted.len(),
                probed = probed_total,
                "sampling round complete"
            );

            if accepted.len() >= target.count {
                break;
            }
            if probed_total > budget {
                warn!(
                    key = %target.key,
                    requested = target.count,
                    found = accepted.len(),
                    probed = probed_total,
                    "trial budget exhausted; returning partial candidate set"
                );
                break;
            }
        }

        Ok(CandidateSet {
            accepted,
            requested: target.count,
            probed: probed_total,
        })
    }
}

/// Draws `n` area-uniform random offsets from the target's anchor.
///
/// Bearing is uniform over [0, 2π); distance is `sqrt(U(0,1)) * radius` so
/// points are uniform over the disk's area rather than clustered at the
/// center.
fn draw_candidates<R: Rng>(
    target: &SampleTarget,
    n: usize,
    rng: &mut R,
) -> Result<Vec<Location>, SampleError> {
    let mut candidates = Vec::with_capacity(n);
    for _ in 0..n {
        let bearing = rng.random_range(0.0..2.0 * PI);
        let distance = rng.random_range(0.0..1.0_f64).sqrt() * target.radius_km;
        let candidate =
            destination(target.anchor, distance, bearing).map_err(|e| SampleError::InvalidTarget {
                key: target.key.clone(),
                reason: e.to_string(),
            })?;
        candidates.push(candidate);
    }
    Ok(candidates)
}

fn validate_target(target: &SampleTarget) -> Result<(), SampleError> {
    let fail = |reason: &str| {
        Err(SampleError::InvalidTarget {
            key: target.key.clone(),
            reason: reason.to_string(),
        })
    };

    if target.count == 0 {
        return fail("requested count must be at least 1");
    }
    if !target.radius_km.is_finite() || target.radius_km <= 0.0 {
        return fail("search radius must be positive");
    }
    if target.search_radius_m == 0 {
        return fail("availability search radius must be positive");
    }
    Ok(())
}
