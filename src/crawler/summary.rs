//! Run summary collected by the coordinator

use crate::state::TargetState;
use crate::FailureKind;
use std::time::Duration;

/// Terminal outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcomes {
    pub persisted: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Outcomes {
    /// Counts a terminal state; active states are ignored
    pub fn record(&mut self, state: TargetState) {
        match state {
            TargetState::Persisted => self.persisted += 1,
            TargetState::Failed => self.failed += 1,
            TargetState::Skipped => self.skipped += 1,
            _ => {}
        }
    }

    pub fn total(&self) -> usize {
        self.persisted + self.failed + self.skipped
    }
}

/// A target or song that ended `Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub target: String,
    /// `None` for errors that aborted the run without a classification
    pub kind: Option<FailureKind>,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Configured targets (song, album and artist entries)
    pub targets: Outcomes,
    /// Songs, whether configured directly or reached through fan-out
    pub songs: Outcomes,
    pub failures: Vec<FailureRecord>,
    pub network_requests: u64,
    pub cache_hits: u64,
    pub simulated: bool,
    pub aborted: bool,
    pub duration: Duration,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        !self.aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_record_terminal_states_only() {
        let mut outcomes = Outcomes::default();
        outcomes.record(TargetState::Persisted);
        outcomes.record(TargetState::Skipped);
        outcomes.record(TargetState::Failed);
        outcomes.record(TargetState::Fetching);

        assert_eq!(
            outcomes,
            Outcomes {
                persisted: 1,
                failed: 1,
                skipped: 1
            }
        );
        assert_eq!(outcomes.total(), 3);
    }
}
