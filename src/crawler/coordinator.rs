//! Scrape coordinator - main orchestration logic
//!
//! This module drives every configured target through its state machine:
//! - Resolving the target into a page URL
//! - Fetching and parsing the page
//! - Fanning artists and albums out into their songs
//! - Handing resolved records to storage
//! - Applying the error policy after each failure

use crate::cache::{hash_key, ComputeCache, WebCache};
use crate::config::{AlbumTarget, ArtistTarget, Config, SongTarget};
use crate::crawler::fetcher::{FetchResponse, Fetcher};
use crate::crawler::policy::{ErrorPolicy, PolicyDecision};
use crate::crawler::resolver::{Resolver, TargetQuery};
use crate::crawler::sampling::{sample_songs, YearFilter};
use crate::crawler::summary::{FailureRecord, RunSummary};
use crate::site::{
    ArtistPage, AzLyrics, CatalogSong, LyricsSite, PageKind, ParsedPage, SongPage, TargetKind,
};
use crate::state::{TargetLifecycle, TargetState};
use crate::storage::{SongRecord, SqliteStorage, Storage, UrlKind};
use crate::{Result, ScrapeError};
use std::time::Instant;
use url::Url;

/// Share of the compute cache budget given to search resolutions; parsed
/// pages get the rest
const RESOLVER_BUDGET_DIVISOR: usize = 4;

/// Whether an outcome counts as a configured target or a fanned-out song
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Target,
    ConfiguredSong,
    Song,
}

/// Main scrape coordinator structure
pub struct Coordinator {
    config: Config,
    site: Box<dyn LyricsSite>,
    fetcher: Fetcher,
    resolver: Resolver,
    page_cache: Option<ComputeCache<ParsedPage>>,
    /// `None` in simulate mode: the database is never opened
    storage: Option<SqliteStorage>,
    policy: ErrorPolicy,
    summary: RunSummary,
}

impl Coordinator {
    /// Creates a coordinator for the AZLyrics backend
    pub fn new(config: Config) -> Result<Self> {
        let site = AzLyrics::new(&config.site)?;
        Self::with_site(config, Box::new(site))
    }

    /// Creates a coordinator for any site backend
    ///
    /// Opens the web cache (purging expired entries) and the database, and
    /// truncates the database when `overwrite_db` is set.
    pub fn with_site(config: Config, site: Box<dyn LyricsSite>) -> Result<Self> {
        let web_cache = if config.use_webcache {
            let path = config.webcache_path();
            let cache = WebCache::open(&path)?;
            let purged = cache.purge_expired()?;
            tracing::info!(
                "Web cache at {} ({} expired entries purged)",
                path.display(),
                purged
            );
            Some(cache)
        } else {
            tracing::info!("Web cache disabled");
            None
        };

        let (resolution_cache, page_cache) = if config.use_compute_cache {
            let total = budget_bytes(config.ram_size);
            let resolver_share = total / RESOLVER_BUDGET_DIVISOR;
            (
                Some(ComputeCache::new(resolver_share)),
                Some(ComputeCache::new(total - resolver_share)),
            )
        } else {
            (None, None)
        };

        let storage = if config.simulate {
            if config.overwrite_db {
                tracing::warn!("overwrite_db is ignored in simulate mode");
            }
            tracing::info!("Simulate mode: nothing will be written to the database");
            None
        } else {
            let mut storage = SqliteStorage::new(&config.db_path())?;
            if config.overwrite_db {
                tracing::warn!("Truncating every table of {}", config.db_path().display());
                storage.truncate()?;
            }
            Some(storage)
        };

        let fetcher = Fetcher::new(&config, web_cache)?;
        tracing::info!("Using lyrics site backend '{}'", site.name());

        Ok(Self {
            resolver: Resolver::new(config.best_match, resolution_cache),
            policy: ErrorPolicy::new(config.ignore_errors),
            summary: RunSummary {
                simulated: config.simulate,
                ..Default::default()
            },
            config,
            site,
            fetcher,
            page_cache,
            storage,
        })
    }

    /// Runs every configured target, songs first, then albums, then artists
    ///
    /// Returns the summary, or the error that aborted the run; the partial
    /// summary stays available through [`Coordinator::summary`].
    pub async fn run(&mut self) -> Result<RunSummary> {
        let start_time = Instant::now();
        tracing::info!("Starting scrape of {} targets", self.config.target_count());

        let result = self.run_targets().await;

        self.summary.duration = start_time.elapsed();
        self.summary.network_requests = self.fetcher.network_requests();
        self.summary.cache_hits = self.fetcher.cache_hits();

        match result {
            Ok(()) => {
                tracing::info!(
                    "Scrape completed in {:?}: {} targets persisted, {} failed, {} skipped",
                    self.summary.duration,
                    self.summary.targets.persisted,
                    self.summary.targets.failed,
                    self.summary.targets.skipped
                );
                Ok(self.summary.clone())
            }
            Err(e) => {
                self.summary.aborted = true;
                tracing::error!("Scrape aborted after {:?}: {}", self.summary.duration, e);
                Err(e)
            }
        }
    }

    /// Summary of the run so far
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    async fn run_targets(&mut self) -> Result<()> {
        let songs = self.config.songs_config.clone();
        let albums = self.config.albums_config.clone();
        let artists = self.config.artists_config.clone();
        let total = self.config.target_count();
        let mut done = 0;

        if songs.skip {
            self.skip_section("song", songs.targets.len());
        } else {
            for entry in &songs.targets {
                self.run_song_target(&entry.to_target()).await?;
                done += 1;
                tracing::info!("Progress: {}/{} targets", done, total);
            }
        }

        if albums.skip {
            self.skip_section("album", albums.targets.len());
        } else {
            for target in &albums.targets {
                self.run_album_target(target).await?;
                done += 1;
                tracing::info!("Progress: {}/{} targets", done, total);
            }
        }

        if artists.skip {
            self.skip_section("artist", artists.targets.len());
        } else {
            for target in &artists.targets {
                self.run_artist_target(target).await?;
                done += 1;
                tracing::info!("Progress: {}/{} targets", done, total);
            }
        }

        Ok(())
    }

    fn skip_section(&mut self, kind: &str, count: usize) {
        if count > 0 {
            tracing::info!("Skipping {} {} targets (skip = true)", count, kind);
        }
        for index in 0..count {
            let mut lifecycle = TargetLifecycle::new(format!("{} target #{}", kind, index + 1));
            // Pending -> Skipped is always legal
            if lifecycle.advance(TargetState::Skipped).is_ok() {
                self.summary.targets.record(lifecycle.state());
            }
        }
    }

    async fn run_song_target(&mut self, target: &SongTarget) -> Result<()> {
        let query = TargetQuery {
            kind: TargetKind::Song,
            title: target.title.clone(),
            artist: target.artist.clone(),
            url: target.url.clone(),
        };
        let mut lifecycle = TargetLifecycle::new(query.label());
        let outcome = self.process_song(&query, &mut lifecycle, None).await;
        self.settle(Scope::ConfiguredSong, lifecycle, outcome)
    }

    async fn run_album_target(&mut self, target: &AlbumTarget) -> Result<()> {
        let mut lifecycle = TargetLifecycle::new(
            TargetQuery {
                kind: TargetKind::Album,
                title: target.title.clone(),
                artist: target.artist.clone(),
                url: target.url.clone(),
            }
            .label(),
        );
        let outcome = self.process_album(target, &mut lifecycle).await;
        self.settle(Scope::Target, lifecycle, outcome)
    }

    async fn run_artist_target(&mut self, target: &ArtistTarget) -> Result<()> {
        let mut lifecycle = TargetLifecycle::new(
            TargetQuery {
                kind: TargetKind::Artist,
                title: target.name.clone(),
                artist: None,
                url: target.url.clone(),
            }
            .label(),
        );
        let outcome = self.process_artist(target, &mut lifecycle).await;
        self.settle(Scope::Target, lifecycle, outcome)
    }

    /// Counts the outcome and applies the error policy to failures
    fn settle(
        &mut self,
        scope: Scope,
        mut lifecycle: TargetLifecycle,
        outcome: Result<TargetState>,
    ) -> Result<()> {
        let state = match outcome {
            Ok(state) => state,
            Err(e) => {
                let decision = self.policy.handle(lifecycle.label(), &e);
                lifecycle.advance(TargetState::Failed)?;
                self.summary.failures.push(FailureRecord {
                    target: lifecycle.label().to_string(),
                    kind: e.kind(),
                    message: e.to_string(),
                });
                self.count(scope, TargetState::Failed);
                return match decision {
                    PolicyDecision::SkipAndContinue => Ok(()),
                    PolicyDecision::AbortRun => Err(e),
                };
            }
        };
        self.count(scope, state);
        Ok(())
    }

    fn count(&mut self, scope: Scope, state: TargetState) {
        match scope {
            Scope::Target => self.summary.targets.record(state),
            Scope::Song => self.summary.songs.record(state),
            Scope::ConfiguredSong => {
                self.summary.targets.record(state);
                self.summary.songs.record(state);
            }
        }
    }

    // ===== Songs =====

    /// Resolves, fetches, parses, filters and persists one song
    async fn process_song(
        &mut self,
        query: &TargetQuery,
        lifecycle: &mut TargetLifecycle,
        filter: Option<YearFilter>,
    ) -> Result<TargetState> {
        lifecycle.advance(TargetState::Resolving)?;
        let resolution = self
            .resolver
            .resolve(query, &mut self.fetcher, self.site.as_ref())
            .await?;
        let (page_url, kind) = self.site.classify_url(&resolution.url)?;
        if kind != PageKind::Song {
            return Err(ScrapeError::InvalidTarget(format!(
                "{} is not a lyrics page",
                page_url
            )));
        }

        let attempt = self.visit_song_page(&page_url, lifecycle, filter).await;
        let owner = match &attempt {
            Ok(Some(title)) => Some(title.as_str()),
            _ => None,
        };
        self.record_url(UrlKind::Song, page_url.as_str(), owner, attempt.is_ok())?;

        let state = match attempt? {
            Some(_) => TargetState::Persisted,
            None => TargetState::Skipped,
        };
        lifecycle.advance(state)?;
        Ok(state)
    }

    /// Returns the persisted song title, or `None` when the year filter
    /// rejected the song
    async fn visit_song_page(
        &mut self,
        page_url: &Url,
        lifecycle: &mut TargetLifecycle,
        filter: Option<YearFilter>,
    ) -> Result<Option<String>> {
        lifecycle.advance(TargetState::Fetching)?;
        let response = self.fetcher.fetch_page(page_url.as_str()).await?;

        lifecycle.advance(TargetState::Parsing)?;
        let song = self.parse_song_page(page_url, &response)?;

        if let Some(filter) = filter {
            if !filter.accepts(song.year) {
                tracing::info!(
                    "Skipping '{}' by {}: year {} outside the requested range",
                    song.title,
                    song.artist,
                    song.year.map_or_else(|| "unknown".to_string(), |y| y.to_string())
                );
                return Ok(None);
            }
        }

        self.persist_song(&song)?;
        Ok(Some(song.title))
    }

    fn persist_song(&mut self, song: &SongPage) -> Result<()> {
        let record = SongRecord {
            title: song.title.clone(),
            artist: song.artist.clone(),
            album: song.album.clone(),
            lyrics: Some(song.lyrics.clone()).filter(|lyrics| !lyrics.is_empty()),
            year: song.year,
        };

        match self.storage.as_mut() {
            Some(storage) => {
                storage.save_song(&record)?;
                tracing::debug!("Saved '{}' by {}", record.title, record.artist);
            }
            None => tracing::info!(
                "[simulate] would save '{}' by {} (album: {}, year: {})",
                record.title,
                record.artist,
                record.album.as_deref().unwrap_or("none"),
                record.year.map_or_else(|| "unknown".to_string(), |y| y.to_string())
            ),
        }
        Ok(())
    }

    /// Runs a fanned-out song through its own lifecycle
    async fn run_child_song(
        &mut self,
        song: &CatalogSong,
        artist: &str,
        filter: Option<YearFilter>,
    ) -> Result<()> {
        let query = TargetQuery {
            kind: TargetKind::Song,
            title: song.title.clone(),
            artist: Some(artist.to_string()),
            url: Some(song.url.clone()),
        };
        let mut lifecycle = TargetLifecycle::new(query.label());
        let outcome = self.process_song(&query, &mut lifecycle, filter).await;
        self.settle(Scope::Song, lifecycle, outcome)
    }

    // ===== Albums =====

    async fn process_album(
        &mut self,
        target: &AlbumTarget,
        lifecycle: &mut TargetLifecycle,
    ) -> Result<TargetState> {
        lifecycle.advance(TargetState::Resolving)?;
        let query = TargetQuery {
            kind: TargetKind::Album,
            title: target.title.clone(),
            artist: target.artist.clone(),
            url: target.url.clone(),
        };
        let resolution = self
            .resolver
            .resolve(&query, &mut self.fetcher, self.site.as_ref())
            .await?;
        let (album_url, kind) = self.site.classify_url(&resolution.url)?;
        let album_id = match kind {
            PageKind::Artist {
                album_id: Some(id),
            } => id,
            _ => {
                return Err(ScrapeError::InvalidTarget(format!(
                    "{} does not point at an album of an artist page",
                    album_url
                )))
            }
        };

        let mut page_url = album_url.clone();
        page_url.set_fragment(None);

        let attempt = self.visit_artist_page(&page_url, lifecycle).await;
        let page = match attempt {
            Ok(page) => page,
            Err(e) => {
                self.record_url(UrlKind::Album, album_url.as_str(), None, false)?;
                return Err(e);
            }
        };

        let Some(section) = page.album_section(&album_id) else {
            self.record_url(UrlKind::Album, album_url.as_str(), None, false)?;
            return Err(ScrapeError::parse(
                album_url.as_str(),
                format!("album #{} not found on artist page", album_id),
            ));
        };
        let album = section.album.clone().ok_or_else(|| {
            ScrapeError::parse(album_url.as_str(), "album section has no header")
        })?;

        self.persist_artist(&page.artist)?;
        self.persist_album(&album.title, &page.artist, album.year)?;
        self.record_url(UrlKind::Album, album_url.as_str(), Some(&album.title), true)?;

        let sampled = sample_songs(
            &section.songs,
            target.max_songs,
            target.choose_random,
            self.config.seed,
        );
        tracing::info!(
            "Album '{}' by {}: {} of {} songs selected",
            album.title,
            page.artist,
            sampled.len(),
            section.songs.len()
        );

        for song in &sampled {
            self.run_child_song(song, &page.artist, None).await?;
        }

        lifecycle.advance(TargetState::Persisted)?;
        Ok(TargetState::Persisted)
    }

    // ===== Artists =====

    async fn process_artist(
        &mut self,
        target: &ArtistTarget,
        lifecycle: &mut TargetLifecycle,
    ) -> Result<TargetState> {
        lifecycle.advance(TargetState::Resolving)?;
        let query = TargetQuery {
            kind: TargetKind::Artist,
            title: target.name.clone(),
            artist: None,
            url: target.url.clone(),
        };
        let resolution = self
            .resolver
            .resolve(&query, &mut self.fetcher, self.site.as_ref())
            .await?;
        let (mut page_url, kind) = self.site.classify_url(&resolution.url)?;
        if kind == PageKind::Song {
            return Err(ScrapeError::InvalidTarget(format!(
                "{} is a lyrics page, not an artist page",
                page_url
            )));
        }
        page_url.set_fragment(None);

        let page = match self.visit_artist_page(&page_url, lifecycle).await {
            Ok(page) => page,
            Err(e) => {
                self.record_url(UrlKind::Artist, page_url.as_str(), None, false)?;
                return Err(e);
            }
        };

        self.persist_artist(&page.artist)?;
        self.record_url(UrlKind::Artist, page_url.as_str(), Some(&page.artist), true)?;

        let filter = YearFilter {
            year_after: target.year_after,
            year_before: target.year_before,
            include_unknown_year: target.include_unknown_year,
        };

        let catalog: Vec<CatalogSong> = page
            .sections
            .iter()
            .filter(|section| section.album.is_some() || filter.include_unknown_year)
            .flat_map(|section| section.songs.iter().cloned())
            .collect();

        let sampled = sample_songs(
            &catalog,
            target.max_songs,
            target.choose_random,
            self.config.seed,
        );
        tracing::info!(
            "Artist {}: {} of {} songs selected",
            page.artist,
            sampled.len(),
            catalog.len()
        );

        for song in &sampled {
            self.run_child_song(song, &page.artist, Some(filter)).await?;
        }

        lifecycle.advance(TargetState::Persisted)?;
        Ok(TargetState::Persisted)
    }

    async fn visit_artist_page(
        &mut self,
        page_url: &Url,
        lifecycle: &mut TargetLifecycle,
    ) -> Result<ArtistPage> {
        lifecycle.advance(TargetState::Fetching)?;
        let response = self.fetcher.fetch_page(page_url.as_str()).await?;

        lifecycle.advance(TargetState::Parsing)?;
        let page = self.parse_artist_page(page_url, &response)?;
        tracing::debug!(
            "{}: {} sections, {} songs",
            page.artist,
            page.sections.len(),
            page.song_count()
        );
        Ok(page)
    }

    fn persist_artist(&mut self, name: &str) -> Result<()> {
        match self.storage.as_mut() {
            Some(storage) => storage.upsert_artist(name)?,
            None => tracing::info!("[simulate] would save artist {}", name),
        }
        Ok(())
    }

    fn persist_album(&mut self, title: &str, artist: &str, year: Option<i32>) -> Result<()> {
        match self.storage.as_mut() {
            Some(storage) => storage.upsert_album(title, artist, year)?,
            None => tracing::info!("[simulate] would save album '{}' by {}", title, artist),
        }
        Ok(())
    }

    fn record_url(
        &mut self,
        kind: UrlKind,
        url: &str,
        owner: Option<&str>,
        success: bool,
    ) -> Result<()> {
        match self.storage.as_mut() {
            Some(storage) => storage.record_url(kind, url, owner, success)?,
            None => tracing::debug!(
                "[simulate] would record {} URL {} (success: {})",
                kind,
                url,
                success
            ),
        }
        Ok(())
    }

    // ===== Parsing =====

    fn parse_song_page(&mut self, page_url: &Url, response: &FetchResponse) -> Result<SongPage> {
        let site = self.site.as_ref();
        let parsed = cached_parse(&mut self.page_cache, page_url, &response.body, || {
            site.parse_song_page(page_url, &response.body).map(ParsedPage::Song)
        })?;
        match parsed {
            ParsedPage::Song(song) => Ok(song),
            ParsedPage::Artist(_) => Err(ScrapeError::parse(
                page_url.as_str(),
                "expected a lyrics page, found an artist page",
            )),
        }
    }

    fn parse_artist_page(
        &mut self,
        page_url: &Url,
        response: &FetchResponse,
    ) -> Result<ArtistPage> {
        let site = self.site.as_ref();
        let parsed = cached_parse(&mut self.page_cache, page_url, &response.body, || {
            site.parse_artist_page(page_url, &response.body)
                .map(ParsedPage::Artist)
        })?;
        match parsed {
            ParsedPage::Artist(page) => Ok(page),
            ParsedPage::Song(_) => Err(ScrapeError::parse(
                page_url.as_str(),
                "expected an artist page, found a lyrics page",
            )),
        }
    }
}

/// Parses through the compute cache, keyed by the page URL and body
fn cached_parse<F>(
    cache: &mut Option<ComputeCache<ParsedPage>>,
    page_url: &Url,
    body: &str,
    parse: F,
) -> Result<ParsedPage>
where
    F: FnOnce() -> Result<ParsedPage>,
{
    let key = hash_key(&[page_url.as_str(), body]);
    if let Some(hit) = cache.as_mut().and_then(|cache| cache.get(&key)) {
        tracing::debug!("Parsed page for {} served from compute cache", page_url);
        return Ok(hit);
    }

    let parsed = parse()?;
    if let Some(cache) = cache.as_mut() {
        cache.put(key, parsed.clone());
    }
    Ok(parsed)
}

fn budget_bytes(megabytes: u64) -> usize {
    usize::try_from(megabytes.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
}
