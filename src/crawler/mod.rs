//! Crawler module for resolving, fetching and processing targets
//!
//! This module contains the core scraping logic, including:
//! - Cached, rate-limited HTTP fetching
//! - Search-based resolution of targets into page URLs
//! - Song sampling and year filtering for artist and album fan-out
//! - Error policy and run coordination

mod coordinator;
mod fetcher;
mod policy;
mod resolver;
mod sampling;
mod summary;

pub use coordinator::Coordinator;
pub use fetcher::{build_header_map, build_http_client, FetchResponse, Fetcher, RateLimiter};
pub use policy::{ErrorPolicy, PolicyDecision};
pub use resolver::{normalize, select_candidate, Resolution, Resolver, TargetQuery};
pub use sampling::{sample_songs, YearFilter};
pub use summary::{FailureRecord, Outcomes, RunSummary};

use crate::config::Config;
use crate::Result;

/// Runs a complete scrape with the default site backend
///
/// Convenience wrapper around [`Coordinator::new`] and [`Coordinator::run`].
pub async fn scrape(config: Config) -> Result<RunSummary> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run().await
}
