//! Error policy: isolate a failing target or abort the run

use crate::ScrapeError;

/// What the coordinator does after a target failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Mark the target failed and move on
    SkipAndContinue,
    /// Stop the run and propagate the error
    AbortRun,
}

#[derive(Debug, Clone, Copy)]
pub struct ErrorPolicy {
    ignore_errors: bool,
}

impl ErrorPolicy {
    pub fn new(ignore_errors: bool) -> Self {
        Self { ignore_errors }
    }

    /// Decides the fate of `target` after `error`
    ///
    /// Classified errors are isolated when errors are ignored. Storage, cache
    /// and internal errors always abort.
    pub fn handle(&self, target: &str, error: &ScrapeError) -> PolicyDecision {
        match error.kind() {
            Some(kind) if self.ignore_errors => {
                tracing::warn!("[{}] {} failed: {}", kind, target, error);
                PolicyDecision::SkipAndContinue
            }
            Some(kind) => {
                tracing::error!("[{}] {} failed, aborting run: {}", kind, target, error);
                PolicyDecision::AbortRun
            }
            None => {
                tracing::error!("{} hit an unrecoverable error: {}", target, error);
                PolicyDecision::AbortRun
            }
        }
    }
}
