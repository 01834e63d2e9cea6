//! Progress reporting decoupled from retrieval control flow.
//!
//! Orchestrators never print; they notify a [`ProgressObserver`] keyed by
//! task ID. The CLI supplies a progress-bar implementation, library users
//! get [`LogObserver`] or [`NullObserver`].

use tracing::{info, warn};

/// Receives retrieval lifecycle events. Implementations must be cheap and
/// must not panic; they are called from worker threads.
pub trait ProgressObserver: Send + Sync {
    /// A task began work toward `target` artifacts, `existing` of which
    /// were already on disk.
    fn task_started(&self, key: &str, target: usize, existing: usize) {
        let _ = (key, target, existing);
    }

    /// A task needed no work at all.
    fn task_skipped(&self, key: &str) {
        let _ = key;
    }

    /// One artifact was written and journaled.
    fn artifact_written(&self, key: &str, file_name: &str) {
        let _ = (key, file_name);
    }

    /// A task finished short of its target.
    fn shortfall(&self, key: &str, requested: usize, delivered: usize) {
        let _ = (key, requested, delivered);
    }

    /// A task finished, successfully or not.
    fn task_finished(&self, key: &str) {
        let _ = key;
    }
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {}

/// Observer that forwards events to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn task_started(&self, key: &str, target: usize, existing: usize) {
        info!(key, target, existing, "task started");
    }

    fn task_skipped(&self, key: &str) {
        info!(key, "task already complete, skipping");
    }

    fn artifact_written(&self, key: &str, file_name: &str) {
        info!(key, file_name, "artifact written");
    }

    fn shortfall(&self, key: &str, requested: usize, delivered: usize) {
        warn!(key, requested, delivered, "task finished short of target");
    }

    fn task_finished(&self, key: &str) {
        info!(key, "task finished");
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records events for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingObserver {
        pub events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }

    impl ProgressObserver for RecordingObserver {
        fn task_started(&self, key: &str, target: usize, existing: usize) {
            self.events
                .lock()
                .push(format!("started {key} {target} {existing}"));
        }

        fn task_skipped(&self, key: &str) {
            self.events.lock().push(format!("skipped {key}"));
        }

        fn artifact_written(&self, key: &str, file_name: &str) {
            self.events.lock().push(format!("written {key} {file_name}"));
        }

        fn shortfall(&self, key: &str, requested: usize, delivered: usize) {
            self.events
                .lock()
                .push(format!("shortfall {key} {requested} {delivered}"));
        }

        fn task_finished(&self, key: &str) {
            self.events.lock().push(format!("finished {key}"));
        }
    }

    #[test]
    fn test_default_methods_are_no_ops() {
        let observer = NullObserver;
        observer.task_started("a", 3, 0);
        observer.artifact_written("a", "image0.jpg");
        observer.task_finished("a");
    }
}
