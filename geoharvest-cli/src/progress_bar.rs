//! Terminal progress reporting for retrieval runs.

use geoharvest::progress::ProgressObserver;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress-bar observer: one tick per finished task, with the latest
/// event shown as the bar message.
pub struct BarObserver {
    bar: ProgressBar,
}

impl BarObserver {
    pub fn new(total_tasks: usize) -> Self {
        let bar = ProgressBar::new(total_tasks as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

impl ProgressObserver for BarObserver {
    fn task_started(&self, key: &str, target: usize, existing: usize) {
        self.bar
            .set_message(format!("{key}: {existing}/{target} on disk"));
    }

    fn task_skipped(&self, key: &str) {
        self.bar.set_message(format!("{key}: already complete"));
        self.bar.inc(1);
    }

    fn artifact_written(&self, key: &str, file_name: &str) {
        self.bar.set_message(format!("{key}: {file_name}"));
    }

    fn shortfall(&self, key: &str, requested: usize, delivered: usize) {
        self.bar
            .set_message(format!("{key}: only {delivered}/{requested} found"));
    }

    fn task_finished(&self, key: &str) {
        let _ = key;
        self.bar.inc(1);
    }
}
