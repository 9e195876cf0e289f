//! Per-target build status
//!
//! Each [`TargetStatus`] has exactly one writer (its target runner) and
//! any number of readers (the progress monitor, the install composer).
//! With a single writer per field, plain atomic stores and loads are
//! enough; no locking is required anywhere.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Shared status record for one target's build pipeline
#[derive(Debug)]
pub struct TargetStatus {
    /// Last observed progress percentage (not the maximum seen)
    progress: AtomicU8,
    /// Set once, when the runner reaches a terminal state
    finished: AtomicBool,
    /// Valid only once `finished` is set
    succeeded: AtomicBool,
    /// Build log location, fixed at creation
    log_path: PathBuf,
}

impl TargetStatus {
    /// Create a status record for a runner logging to `log_path`
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            progress: AtomicU8::new(0),
            finished: AtomicBool::new(false),
            succeeded: AtomicBool::new(false),
            log_path,
        }
    }

    /// Publish a newly observed progress percentage (writer only)
    pub fn set_progress(&self, percent: u8) {
        self.progress.store(percent.min(100), Ordering::Relaxed);
    }

    /// Mark the pipeline terminal (writer only, called exactly once)
    pub fn finish(&self, success: bool) {
        debug_assert!(!self.finished.load(Ordering::Relaxed));
        self.succeeded.store(success, Ordering::Relaxed);
        // Release-publishes the success flag along with completion
        self.finished.store(true, Ordering::Release);
    }

    /// Latest progress percentage
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    /// Whether the pipeline reached a terminal state
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Terminal outcome: None while running, Some(success) afterwards
    ///
    /// The success flag is never observable before completion.
    pub fn outcome(&self) -> Option<bool> {
        if self.finished.load(Ordering::Acquire) {
            Some(self.succeeded.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    /// Path of this target's build log
    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }
}
