//! Lyrics-Scraper: a polite lyrics crawler
//!
//! This crate resolves artist, album and song targets against a single lyrics
//! website, fetches and parses their pages behind a rate-limited, cached
//! fetcher, and persists deduplicated records into a SQLite music database.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod output;
pub mod site;
pub mod state;
pub mod storage;

use std::fmt;
use thiserror::Error;

/// Main error type for Lyrics-Scraper operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TargetState,
        to: state::TargetState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Returns the failure classification used by the error policy
    ///
    /// Errors that return `None` are not per-target failures (database,
    /// cache or internal errors) and always abort the run.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Network { .. } => Some(FailureKind::Network),
            Self::NotFound(_) => Some(FailureKind::NotFound),
            Self::Parse { .. } => Some(FailureKind::Parse),
            Self::InvalidTarget(_) | Self::UrlParse(_) => Some(FailureKind::Config),
            _ => None,
        }
    }

    pub(crate) fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    pub(crate) fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Classification of a per-target failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Timeout, connection failure or unexpected HTTP status
    Network,
    /// No search candidate or HTTP 404
    NotFound,
    /// Page structure not recognized
    Parse,
    /// Malformed or unresolvable target specification
    Config,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "NetworkError",
            Self::NotFound => "NotFoundError",
            Self::Parse => "ParseError",
            Self::Config => "ConfigError",
        };
        write!(f, "{}", name)
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Lyrics-Scraper operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, RunSummary};
pub use state::TargetState;
