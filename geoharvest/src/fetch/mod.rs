//! Resumable, bounded-concurrency artifact retrieval.
//!
//! The orchestrator dispatches per-location tasks across a fixed-size
//! worker pool. Each task recovers its progress from the filesystem,
//! plans only the missing artifacts, downloads them with bounded retry
//! and journals every write. One task failing never aborts its siblings;
//! a cancelled run leaves a consistent on-disk state that a rerun picks
//! up from.

mod journal;
mod planner;
mod resume;

pub use journal::JournalSpec;
pub use planner::{ArtifactPlan, ArtifactPlanner, SatellitePlanner, StreetViewPlanner};
pub use resume::{count_existing_images, next_free_image_names};

use crate::config::ConfigError;
use crate::geo::Location;
use crate::http::{HttpClient, HttpError};
use crate::progress::{NullObserver, ProgressObserver};
use crate::retry::{run_with_retry, CancelFlag, RetryError, RetryPolicy};
use crate::sampler::SampleError;
use crate::zoom::ZoomError;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Errors from fetch orchestration.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("journal write failed: {0}")]
    Journal(#[from] csv::Error),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Request(#[from] crate::request::RequestError),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Zoom(#[from] ZoomError),

    #[error("download failed: {0}")]
    Transfer(#[from] RetryError<HttpError>),

    /// The planner was never given this task at construction time.
    #[error("no plan exists for task {key:?}")]
    UnplannedTask { key: String },
}

impl FetchError {
    fn is_cancelled(&self) -> bool {
        match self {
            Self::Transfer(RetryError::Cancelled) => true,
            Self::Sample(e) => e.is_cancelled(),
            _ => false,
        }
    }
}

/// One unit of per-location work.
#[derive(Debug, Clone)]
pub struct FetchTask {
    /// Opaque location identifier; drives file naming and journal rows.
    pub key: String,
    pub anchor: Location,
    /// Directory artifacts and the journal live in. Created on demand.
    pub dir: PathBuf,
    /// Total artifacts this task should end up with.
    pub target_count: usize,
}

/// Terminal state of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// All `target_count` artifacts are on disk.
    Completed,
    /// Nothing to do; the target was already met.
    Skipped,
    /// Finished with fewer artifacts than requested.
    Partial { requested: usize, delivered: usize },
    /// The task aborted on a non-retryable or exhausted error.
    Failed(String),
    /// Cancellation was observed before the task finished.
    Cancelled,
}

/// Per-task result reported by [`FetchOrchestrator::run`].
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub key: String,
    pub status: TaskStatus,
    /// Artifacts newly written by this run.
    pub written: usize,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Skipped)
    }
}

/// Drives a set of tasks to completion over a bounded worker pool.
pub struct FetchOrchestrator<C, P>
where
    C: HttpClient,
    P: ArtifactPlanner,
{
    client: C,
    planner: P,
    policy: RetryPolicy,
    cancel: CancelFlag,
    workers: usize,
    observer: Arc<dyn ProgressObserver>,
    // Distinct tasks may share a journal file (flat layouts), so appends
    // are serialized globally.
    journal_lock: Mutex<()>,
}

impl<C, P> FetchOrchestrator<C, P>
where
    C: HttpClient,
    P: ArtifactPlanner,
{
    pub fn new(client: C, planner: P, policy: RetryPolicy, cancel: CancelFlag, workers: usize) -> Self {
        Self {
            client,
            planner,
            policy,
            cancel,
            workers: workers.max(1),
            observer: Arc::new(NullObserver),
            journal_lock: Mutex::new(()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Runs every task, returning one outcome per task in input order.
    ///
    /// Individual task failures are captured in their outcome; `Err` is
    /// reserved for being unable to run at all.
    pub fn run(&self, tasks: &[FetchTask]) -> Result<Vec<FetchOutcome>, FetchError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;

        info!(tasks = tasks.len(), workers = self.workers, "starting retrieval");
        let outcomes: Vec<FetchOutcome> =
            pool.install(|| tasks.par_iter().map(|task| self.run_task(task)).collect());

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(tasks = tasks.len(), failed, "retrieval finished");
        Ok(outcomes)
    }

    fn run_task(&self, task: &FetchTask) -> FetchOutcome {
        if self.cancel.is_cancelled() {
            return FetchOutcome {
                key: task.key.clone(),
                status: TaskStatus::Cancelled,
                written: 0,
            };
        }

        // The write count survives the failure path so the outcome
        // reflects what is actually on disk.
        let mut written = 0;
        let status = match self.try_task(task, &mut written) {
            Ok(status) => status,
            Err(e) if e.is_cancelled() => TaskStatus::Cancelled,
            Err(e) => {
                error!(key = %task.key, error = %e, "task failed");
                self.observer.task_finished(&task.key);
                TaskStatus::Failed(e.to_string())
            }
        };
        FetchOutcome {
            key: task.key.clone(),
            status,
            written,
        }
    }

    fn try_task(&self, task: &FetchTask, written: &mut usize) -> Result<TaskStatus, FetchError> {
        std::fs::create_dir_all(&task.dir)?;

        let existing = self.planner.existing_count(task)?;
        if existing >= task.target_count {
            self.observer.task_skipped(&task.key);
            return Ok(TaskStatus::Skipped);
        }

        self.observer.task_started(&task.key, task.target_count, existing);
        let deficit = task.target_count - existing;
        let plans = self.planner.plan(task, deficit)?;

        let mut cancelled = false;
        for plan in &plans {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let bytes = run_with_retry(&self.policy, &self.cancel, || self.client.get(&plan.url))?;
            // The artifact must be durable before its journal row exists;
            // a crash between the two leaves an orphan file, never a
            // journal row without its artifact.
            std::fs::write(task.dir.join(&plan.file_name), &bytes)?;
            {
                let _guard = self.journal_lock.lock();
                journal::append(&task.dir, &self.planner.journal(), &plan.journal_record)?;
            }
            *written += 1;
            self.observer.artifact_written(&task.key, &plan.file_name);
        }

        let delivered = existing + *written;
        let status = if cancelled {
            TaskStatus::Cancelled
        } else if delivered >= task.target_count {
            TaskStatus::Completed
        } else {
            self.observer
                .shortfall(&task.key, task.target_count, delivered);
            TaskStatus::Partial {
                requested: task.target_count,
                delivered,
            }
        };
        self.observer.task_finished(&task.key);

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreetViewSettings;
    use crate::http::tests::MockHttpClient;
    use crate::progress::tests::RecordingObserver;
    use crate::request::MapsApi;
    use std::time::Duration;
    use tempfile::tempdir;

    fn ok_metadata() -> Vec<u8> {
        br#"{"status": "OK"}"#.to_vec()
    }

    fn street_view_orchestrator(
        client: MockHttpClient,
        cancel: CancelFlag,
    ) -> FetchOrchestrator<MockHttpClient, StreetViewPlanner<MockHttpClient>> {
        let policy = RetryPolicy::fixed(2, Duration::ZERO);
        let planner = StreetViewPlanner::new(
            client.clone(),
            MapsApi::new("k").unwrap(),
            StreetViewSettings::default(),
            policy.clone(),
            cancel.clone(),
        )
        .unwrap();
        FetchOrchestrator::new(client, planner, policy, cancel, 1)
    }

    fn task(key: &str, dir: &std::path::Path, target: usize) -> FetchTask {
        FetchTask {
            key: key.to_string(),
            anchor: Location::new(40.0, -74.0).unwrap(),
            dir: dir.join(key),
            target_count: target,
        }
    }

    #[test]
    fn test_resume_fetches_only_the_deficit() {
        let base = tempdir().unwrap();
        let t = task("site", base.path(), 5);

        // Two artifacts from a previous run
        std::fs::create_dir_all(&t.dir).unwrap();
        std::fs::write(t.dir.join("image0.png"), b"old-0").unwrap();
        std::fs::write(t.dir.join("image1.png"), b"old-1").unwrap();

        let client = MockHttpClient::always(Ok(ok_metadata()));
        let orchestrator = street_view_orchestrator(client.clone(), CancelFlag::new());
        let outcomes = orchestrator.run(std::slice::from_ref(&t)).unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, TaskStatus::Completed);
        assert_eq!(outcomes[0].written, 3);

        // 3 probes (batch limit) + 3 image downloads
        assert_eq!(client.request_count(), 6);

        // Pre-existing artifacts untouched
        assert_eq!(std::fs::read(t.dir.join("image0.png")).unwrap(), b"old-0");
        assert_eq!(std::fs::read(t.dir.join("image1.png")).unwrap(), b"old-1");
        for i in 2..5 {
            assert!(t.dir.join(format!("image{i}.png")).exists());
        }

        // Journal holds exactly the three new rows
        let journal = std::fs::read_to_string(t.dir.join("loc.csv")).unwrap();
        let lines: Vec<&str> = journal.lines().collect();
        assert_eq!(lines[0], "name,location");
        assert_eq!(lines.len(), 4);
        for (i, line) in lines[1..].iter().enumerate() {
            assert!(line.starts_with(&format!("image{}.png", i + 2)));
        }
    }

    #[test]
    fn test_complete_task_is_skipped_without_requests() {
        let base = tempdir().unwrap();
        let t = task("site", base.path(), 2);
        std::fs::create_dir_all(&t.dir).unwrap();
        std::fs::write(t.dir.join("image0.png"), b"a").unwrap();
        std::fs::write(t.dir.join("image1.png"), b"b").unwrap();

        let client = MockHttpClient::always(Ok(ok_metadata()));
        let orchestrator = street_view_orchestrator(client.clone(), CancelFlag::new());
        let outcomes = orchestrator.run(std::slice::from_ref(&t)).unwrap();

        assert_eq!(outcomes[0].status, TaskStatus::Skipped);
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn test_failed_task_does_not_abort_siblings() {
        let base = tempdir().unwrap();
        let tasks = vec![task("a", base.path(), 1), task("b", base.path(), 1)];

        // Task a: probe OK, image download fails permanently (404).
        // Task b: probe OK, image download OK. Workers=1 keeps the
        // script order deterministic.
        let client = MockHttpClient::new(vec![
            Ok(ok_metadata()),
            Err(HttpError::Status {
                status: 404,
                url: "u".into(),
            }),
            Ok(ok_metadata()),
            Ok(b"image-bytes".to_vec()),
        ]);
        let orchestrator = street_view_orchestrator(client, CancelFlag::new());
        let outcomes = orchestrator.run(&tasks).unwrap();

        assert!(matches!(outcomes[0].status, TaskStatus::Failed(_)));
        assert_eq!(outcomes[1].status, TaskStatus::Completed);
        assert!(base.path().join("b").join("image0.png").exists());
    }

    #[test]
    fn test_failed_task_reports_artifacts_written_before_the_failure() {
        let base = tempdir().unwrap();
        let t = task("site", base.path(), 2);

        // Two probes succeed, the first download lands, the second fails
        // permanently (404).
        let client = MockHttpClient::new(vec![
            Ok(ok_metadata()),
            Ok(ok_metadata()),
            Ok(b"image-bytes".to_vec()),
            Err(HttpError::Status {
                status: 404,
                url: "u".into(),
            }),
        ]);
        let observer = Arc::new(RecordingObserver::default());
        let policy = RetryPolicy::fixed(1, Duration::ZERO);
        let cancel = CancelFlag::new();
        let planner = StreetViewPlanner::new(
            client.clone(),
            MapsApi::new("k").unwrap(),
            StreetViewSettings::default(),
            policy.clone(),
            cancel.clone(),
        )
        .unwrap();
        let orchestrator = FetchOrchestrator::new(client, planner, policy, cancel, 1)
            .with_observer(observer.clone());

        let outcomes = orchestrator.run(std::slice::from_ref(&t)).unwrap();

        // The outcome counts the artifact that made it to disk
        assert!(matches!(outcomes[0].status, TaskStatus::Failed(_)));
        assert_eq!(outcomes[0].written, 1);
        assert_eq!(
            std::fs::read(t.dir.join("image0.png")).unwrap(),
            b"image-bytes"
        );
        let journal = std::fs::read_to_string(t.dir.join("loc.csv")).unwrap();
        assert_eq!(journal.lines().count(), 2);

        // A failed task still finishes from the observer's point of view
        let events = observer.events();
        assert!(events.iter().any(|e| e == "finished site"));
    }

    #[test]
    fn test_pre_cancelled_run_touches_nothing() {
        let base = tempdir().unwrap();
        let t = task("site", base.path(), 3);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let client = MockHttpClient::always(Ok(ok_metadata()));
        let orchestrator = street_view_orchestrator(client.clone(), cancel);
        let outcomes = orchestrator.run(std::slice::from_ref(&t)).unwrap();

        assert_eq!(outcomes[0].status, TaskStatus::Cancelled);
        assert_eq!(client.request_count(), 0);
        assert!(!t.dir.exists());
    }

    #[test]
    fn test_shortfall_reported_as_partial() {
        let base = tempdir().unwrap();
        let t = task("site", base.path(), 2);

        let client = MockHttpClient::always(Ok(br#"{"status": "ZERO_RESULTS"}"#.to_vec()));
        let observer = Arc::new(RecordingObserver::default());
        let policy = RetryPolicy::fixed(1, Duration::ZERO);
        let cancel = CancelFlag::new();
        let planner = StreetViewPlanner::new(
            client.clone(),
            MapsApi::new("k").unwrap(),
            StreetViewSettings {
                trial_limit: 2,
                ..Default::default()
            },
            policy.clone(),
            cancel.clone(),
        )
        .unwrap();
        let orchestrator = FetchOrchestrator::new(client, planner, policy, cancel, 1)
            .with_observer(observer.clone());

        let outcomes = orchestrator.run(std::slice::from_ref(&t)).unwrap();
        assert_eq!(
            outcomes[0].status,
            TaskStatus::Partial {
                requested: 2,
                delivered: 0
            }
        );

        let events = observer.events();
        assert!(events.iter().any(|e| e == "shortfall site 2 0"));
        assert!(events.iter().any(|e| e == "finished site"));
    }

    #[test]
    fn test_satellite_run_writes_flat_artifacts_and_shared_journal() {
        let base = tempdir().unwrap();
        let tasks: Vec<FetchTask> = ["a", "b"]
            .iter()
            .map(|key| FetchTask {
                key: key.to_string(),
                anchor: Location::new(40.0, -74.0).unwrap(),
                dir: base.path().to_path_buf(),
                target_count: 1,
            })
            .collect();

        let planner = SatellitePlanner::for_tasks(
            MapsApi::new("k").unwrap(),
            crate::config::SatelliteSettings::default(),
            &tasks,
        )
        .unwrap();
        let client = MockHttpClient::always(Ok(b"tile".to_vec()));
        let orchestrator = FetchOrchestrator::new(
            client,
            planner,
            RetryPolicy::fixed(1, Duration::ZERO),
            CancelFlag::new(),
            2,
        );

        let outcomes = orchestrator.run(&tasks).unwrap();
        assert!(outcomes.iter().all(|o| o.status == TaskStatus::Completed));
        assert!(base.path().join("a.png").exists());
        assert!(base.path().join("b.png").exists());

        let journal = std::fs::read_to_string(base.path().join("image_coverage.csv")).unwrap();
        assert_eq!(journal.lines().count(), 3);
        assert_eq!(journal.lines().next(), Some("id,actual_coverage"));
    }
}
