//! Catalog resolver
//!
//! Turns a human-entered target into one concrete page URL, either directly
//! from an explicit URL or through the site's search page.

use crate::cache::{hash_key, ComputeCache, Weigh};
use crate::crawler::fetcher::Fetcher;
use crate::site::{Candidate, LyricsSite, TargetKind};
use crate::{Result, ScrapeError};
use strsim::normalized_levenshtein;
use url::Url;

/// What to look for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetQuery {
    pub kind: TargetKind,
    /// Song or album title, or artist name
    pub title: String,
    pub artist: Option<String>,
    /// Explicit page URL; skips the search
    pub url: Option<String>,
}

impl TargetQuery {
    /// Text typed into the site search: `title by artist`, or the bare
    /// title or artist name
    pub fn search_text(&self) -> String {
        match (self.kind, self.artist.as_deref()) {
            (TargetKind::Song | TargetKind::Album, Some(artist)) => {
                format!("{} by {}", self.title, artist)
            }
            _ => self.title.clone(),
        }
    }

    /// Text compared with the result listing, which shows songs as
    /// `title by artist` and albums as `artist - title`
    pub fn match_text(&self) -> String {
        match (self.kind, self.artist.as_deref()) {
            (TargetKind::Album, Some(artist)) => format!("{} - {}", artist, self.title),
            _ => self.search_text(),
        }
    }

    /// Human readable identity for logs and failure reports
    pub fn label(&self) -> String {
        if self.title.trim().is_empty() {
            if let Some(url) = &self.url {
                return format!("{} {}", self.kind, url);
            }
        }
        format!("{} '{}'", self.kind, self.search_text())
    }

    fn cache_key(&self, best_match: bool) -> String {
        hash_key(&[
            self.kind.search_scope().to_string(),
            normalize(&self.title),
            self.artist.as_deref().map(normalize).unwrap_or_default(),
            best_match.to_string(),
        ])
    }
}

/// Chosen page and the candidates it was picked from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub url: String,
    pub candidates: Vec<Candidate>,
}

impl Weigh for Resolution {
    fn weight(&self) -> usize {
        self.url.weight() + self.candidates.weight()
    }
}

/// Resolves targets, remembering search outcomes in the compute cache
pub struct Resolver {
    best_match: bool,
    cache: Option<ComputeCache<Resolution>>,
}

impl Resolver {
    pub fn new(best_match: bool, cache: Option<ComputeCache<Resolution>>) -> Self {
        Self { best_match, cache }
    }

    pub async fn resolve(
        &mut self,
        query: &TargetQuery,
        fetcher: &mut Fetcher,
        site: &dyn LyricsSite,
    ) -> Result<Resolution> {
        if let Some(url) = &query.url {
            tracing::debug!("Using explicit URL for {}: {}", query.label(), url);
            return Ok(Resolution {
                url: url.clone(),
                candidates: Vec::new(),
            });
        }

        let key = query.cache_key(self.best_match);
        if let Some(hit) = self.cache.as_mut().and_then(|cache| cache.get(&key)) {
            tracing::debug!("Resolution of {} served from compute cache", query.label());
            return Ok(hit);
        }

        let mut candidates = search(fetcher, site, query.kind, &query.search_text()).await?;

        if candidates.is_empty() && query.artist.is_some() {
            tracing::debug!(
                "No result for {}, retrying with the title only",
                query.label()
            );
            candidates = search(fetcher, site, query.kind, &query.title).await?;
        }

        // the artist still ranks results after a title-only retry
        let index = select_candidate(&query.match_text(), &candidates, self.best_match)
            .ok_or_else(|| ScrapeError::NotFound(format!("no search result for {}", query.label())))?;

        tracing::info!(
            "Resolved {} to '{}' ({} of {} results)",
            query.label(),
            candidates[index].text,
            index + 1,
            candidates.len()
        );

        let resolution = Resolution {
            url: candidates[index].url.clone(),
            candidates,
        };
        if let Some(cache) = self.cache.as_mut() {
            cache.put(key, resolution.clone());
        }
        Ok(resolution)
    }
}

async fn search(
    fetcher: &mut Fetcher,
    site: &dyn LyricsSite,
    kind: TargetKind,
    text: &str,
) -> Result<Vec<Candidate>> {
    let url: Url = site.search_url(kind, text)?;
    let response = fetcher.fetch_page(url.as_str()).await?;
    site.parse_search_results(kind, &url, &response.body)
}

/// Lower-cases, strips surrounding quotes and collapses whitespace
pub fn normalize(text: &str) -> String {
    let quotes: &[char] = &['"', '\'', '\u{201c}', '\u{201d}', '\u{2018}', '\u{2019}'];
    text.trim()
        .trim_matches(quotes)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Index of the chosen candidate, or None when there is none
///
/// Without `best_match` the first listed candidate wins. With it, the
/// candidate whose normalized text is most similar to the normalized query
/// wins; on equal scores the earlier listing is kept.
pub fn select_candidate(query: &str, candidates: &[Candidate], best_match: bool) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    if !best_match {
        return Some(0);
    }

    let query = normalize(query);
    let mut best = (0, f64::MIN);
    for (index, candidate) in candidates.iter().enumerate() {
        let score = normalized_levenshtein(&query, &normalize(&candidate.text));
        tracing::trace!("Similarity {:.3} for '{}'", score, candidate.text);
        if score > best.1 {
            best = (index, score);
        }
    }
    Some(best.0)
}
