/// Target state definitions for tracking crawl progress
///
/// Every artist, album and song target walks through these states once;
/// child songs of a fan-out get their own lifecycle.
use crate::ScrapeError;
use std::fmt;

/// Represents the current state of a target in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    // ===== Active States =====
    /// Target is waiting to be processed
    Pending,

    /// Search page or explicit URL is being turned into a source URL
    Resolving,

    /// Source page is being fetched
    Fetching,

    /// Fetched page is being parsed and filtered
    Parsing,

    // ===== Terminal States =====
    /// Records were handed to the persistence layer (or logged in simulate mode)
    Persisted,

    /// A classified error ended the target
    Failed,

    /// Section skipped or target filtered out
    Skipped,
}

impl TargetState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Persisted | Self::Failed | Self::Skipped)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: TargetState) -> bool {
        use TargetState::*;
        matches!(
            (self, next),
            (Pending, Resolving)
                | (Pending, Skipped)
                | (Pending, Failed)
                | (Resolving, Fetching)
                | (Resolving, Failed)
                | (Fetching, Parsing)
                | (Fetching, Failed)
                | (Parsing, Persisted)
                | (Parsing, Skipped)
                | (Parsing, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolving => "resolving",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Persisted => "persisted",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The state of one named target with checked transitions
#[derive(Debug, Clone)]
pub struct TargetLifecycle {
    label: String,
    state: TargetState,
}

impl TargetLifecycle {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: TargetState::Pending,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    /// Moves to `next`, rejecting transitions the state graph does not allow
    pub fn advance(&mut self, next: TargetState) -> Result<(), ScrapeError> {
        if !self.state.can_transition_to(next) {
            return Err(ScrapeError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("{}: {} -> {}", self.label, self.state, next);
        self.state = next;
        Ok(())
    }
}
