//! Progress monitor
//!
//! Polls every running target's status on a fixed interval and renders
//! a single aggregate line. Strictly read-only: correctness of the run
//! never depends on this task, only operator visibility does.

use std::sync::Arc;
use std::time::Duration;

use crate::cli::output;
use crate::config::defaults;
use crate::core::status::TargetStatus;

/// Renders aggregate build progress until every runner is terminal
pub struct ProgressMonitor {
    targets: Vec<(String, Arc<TargetStatus>)>,
    poll: Duration,
}

impl ProgressMonitor {
    /// Create a monitor over the given target statuses
    pub fn new(targets: Vec<(String, Arc<TargetStatus>)>) -> Self {
        Self {
            targets,
            poll: Duration::from_millis(defaults::MONITOR_POLL_MS),
        }
    }

    /// Override the poll interval (tests use a short one)
    #[must_use]
    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// Poll and render until all targets report completion
    ///
    /// Returns within one poll interval of the last completion.
    pub async fn run(self) {
        let bar = output::create_status_line();
        loop {
            bar.set_message(self.summary());
            if self.targets.iter().all(|(_, s)| s.is_finished()) {
                break;
            }
            tokio::time::sleep(self.poll).await;
        }
        bar.finish_and_clear();
    }

    /// One-line summary keyed by target identity
    fn summary(&self) -> String {
        self.targets
            .iter()
            .map(|(os, status)| match status.outcome() {
                Some(true) => format!("{os} {}", output::status::SUCCESS),
                Some(false) => format!("{os} {}", output::status::ERROR),
                None => format!("{os} {:>3}%", status.progress()),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
