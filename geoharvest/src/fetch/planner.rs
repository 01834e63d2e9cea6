//! Artifact planning per retrieval flavor.
//!
//! A planner turns one task's deficit into concrete download plans: the
//! request URL, the destination file name and the journal record. The
//! street-level planner runs the availability sampler to pick locations;
//! the satellite planner maps each anchor to its selected zoom level.

use super::resume::{count_existing_images, next_free_image_names};
use super::{FetchError, FetchTask};
use crate::config::{ConfigError, SatelliteSettings, StreetViewSettings};
use crate::http::HttpClient;
use crate::probe::AvailabilityProbe;
use crate::request::{ImageSize, MapsApi, StreetViewImageSpec};
use crate::retry::{CancelFlag, RetryPolicy};
use crate::sampler::{CandidateSampler, SampleTarget};
use crate::zoom::{select_zoom_levels, ZoomResult};
use crate::fetch::journal::JournalSpec;
use std::collections::HashMap;

/// File extension used for street-level artifacts.
const STREET_VIEW_EXT: &str = "png";

/// One planned artifact download.
#[derive(Debug, Clone)]
pub struct ArtifactPlan {
    pub url: String,
    /// Destination file name relative to the task directory. Guaranteed
    /// unused at plan time.
    pub file_name: String,
    /// One journal row, matching the planner's [`JournalSpec`] columns.
    pub journal_record: Vec<String>,
}

/// Flavor-specific planning behind the shared orchestrator.
pub trait ArtifactPlanner: Send + Sync {
    /// Journal file this planner's artifacts are recorded in.
    fn journal(&self) -> JournalSpec;

    /// Artifacts already on disk for this task.
    fn existing_count(&self, task: &FetchTask) -> Result<usize, FetchError>;

    /// Plans up to `deficit` downloads. Fewer plans than the deficit is a
    /// shortfall, not an error.
    fn plan(&self, task: &FetchTask, deficit: usize) -> Result<Vec<ArtifactPlan>, FetchError>;
}

/// Plans street-level images at sampled, availability-checked locations.
pub struct StreetViewPlanner<C: HttpClient> {
    api: MapsApi,
    settings: StreetViewSettings,
    sampler: CandidateSampler<C, MapsApi>,
}

impl<C: HttpClient> StreetViewPlanner<C> {
    /// The probe shares the orchestrator's retry policy and cancel flag so
    /// sampling honors the same shutdown semantics as the downloads.
    pub fn new(
        client: C,
        api: MapsApi,
        settings: StreetViewSettings,
        policy: RetryPolicy,
        cancel: CancelFlag,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let probe = AvailabilityProbe::new(client, api.clone(), policy, cancel);
        let sampler = CandidateSampler::new(probe).with_trial_limit(settings.trial_limit);
        Ok(Self {
            api,
            settings,
            sampler,
        })
    }
}

impl<C: HttpClient> ArtifactPlanner for StreetViewPlanner<C> {
    fn journal(&self) -> JournalSpec {
        JournalSpec {
            file_name: "loc.csv",
            columns: &["name", "location"],
        }
    }

    fn existing_count(&self, task: &FetchTask) -> Result<usize, FetchError> {
        count_existing_images(&task.dir, STREET_VIEW_EXT)
    }

    fn plan(&self, task: &FetchTask, deficit: usize) -> Result<Vec<ArtifactPlan>, FetchError> {
        let target = SampleTarget {
            key: task.key.clone(),
            anchor: task.anchor,
            count: deficit,
            radius_km: self.settings.radius_km,
            search_radius_m: self.settings.search_radius_m,
            outdoor_only: self.settings.outdoor_only,
        };
        let mut rng = rand::rng();
        let set = self.sampler.sample(&target, &mut rng)?;

        let names = next_free_image_names(&task.dir, STREET_VIEW_EXT, set.locations().len());
        let mut plans = Vec::with_capacity(names.len());
        for (location, name) in set.locations().iter().zip(names) {
            let spec = StreetViewImageSpec {
                size: self.settings.image_size,
                heading: self.settings.heading.resolve(*location, task.anchor, &mut rng),
                fov: self.settings.fov,
                pitch: self.settings.pitch,
                search_radius_m: self.settings.search_radius_m,
                outdoor_only: self.settings.outdoor_only,
            };
            let url = self.api.street_view_image_url(location, &spec)?;
            plans.push(ArtifactPlan {
                url,
                journal_record: vec![name.clone(), location.to_string()],
                file_name: name,
            });
        }
        Ok(plans)
    }
}

/// Plans one overhead satellite image per task at its selected zoom.
pub struct SatellitePlanner {
    api: MapsApi,
    settings: SatelliteSettings,
    zooms: HashMap<String, ZoomResult>,
}

impl SatellitePlanner {
    /// Selects zoom levels for every task up front; the batch selection
    /// exploits latitude ordering instead of scanning per task.
    pub fn for_tasks(
        api: MapsApi,
        settings: SatelliteSettings,
        tasks: &[FetchTask],
    ) -> Result<Self, FetchError> {
        settings.validate()?;
        let latitudes: Vec<f64> = tasks.iter().map(|t| t.anchor.lat()).collect();
        let results = select_zoom_levels(&latitudes, settings.coverage_km, settings.pixel_width)?;
        let zooms = tasks
            .iter()
            .zip(results)
            .map(|(task, zoom)| (task.key.clone(), zoom))
            .collect();
        Ok(Self {
            api,
            settings,
            zooms,
        })
    }

    fn artifact_name(&self, task: &FetchTask) -> String {
        format!("{}.{}", task.key, self.settings.format.extension())
    }
}

impl ArtifactPlanner for SatellitePlanner {
    fn journal(&self) -> JournalSpec {
        JournalSpec {
            file_name: "image_coverage.csv",
            columns: &["id", "actual_coverage"],
        }
    }

    fn existing_count(&self, task: &FetchTask) -> Result<usize, FetchError> {
        Ok(usize::from(task.dir.join(self.artifact_name(task)).exists()))
    }

    fn plan(&self, task: &FetchTask, deficit: usize) -> Result<Vec<ArtifactPlan>, FetchError> {
        if deficit == 0 {
            return Ok(Vec::new());
        }
        let zoom = self
            .zooms
            .get(&task.key)
            .ok_or_else(|| FetchError::UnplannedTask {
                key: task.key.clone(),
            })?;

        let url = self.api.static_map_url(
            &task.anchor,
            zoom.zoom,
            ImageSize::square(self.settings.pixel_width),
            self.settings.scale,
            self.settings.format,
        )?;
        // Square images, so vertical coverage equals horizontal.
        let coverage = format!("{c}x{c}", c = zoom.coverage_km);
        Ok(vec![ArtifactPlan {
            url,
            file_name: self.artifact_name(task),
            journal_record: vec![task.key.clone(), coverage],
        }])
    }
}
