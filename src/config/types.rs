use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration structure for Lyrics-Scraper
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Path to the SQLite music database
    #[serde(default = "default_db_filepath")]
    pub db_filepath: String,

    /// Truncate every table once at start-up
    #[serde(default)]
    pub overwrite_db: bool,

    /// Keep fetched pages in the persistent web cache
    #[serde(default = "default_true")]
    pub use_webcache: bool,

    /// Directory holding the web cache database
    #[serde(default = "default_webcache_dirpath")]
    pub webcache_dirpath: String,

    /// Web cache time-to-live (seconds)
    #[serde(default = "default_expire_after")]
    pub expire_after: u64,

    /// Keep derived results in the in-memory compute cache
    #[serde(default = "default_true")]
    pub use_compute_cache: bool,

    /// Compute cache budget (megabytes)
    #[serde(default = "default_ram_size")]
    pub ram_size: u64,

    /// Timeout for a single HTTP GET (seconds)
    #[serde(default = "default_http_get_timeout")]
    pub http_get_timeout: f64,

    /// Minimum gap between two real network requests (seconds)
    #[serde(default = "default_delay_between_requests")]
    pub delay_between_requests: f64,

    /// Headers sent with every request
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,

    /// Seed for reproducible song sampling
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Pause on block/challenge pages so an operator can intervene
    #[serde(default)]
    pub interactive: bool,

    /// Length of the interactive pause (seconds)
    #[serde(default = "default_delay_interactive")]
    pub delay_interactive: f64,

    /// Pick the most similar search result instead of the first one
    #[serde(default)]
    pub best_match: bool,

    /// Run everything but never write to the database
    #[serde(default)]
    pub simulate: bool,

    /// Keep going after a failed target
    #[serde(default)]
    pub ignore_errors: bool,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub songs_config: SongsConfig,

    #[serde(default)]
    pub albums_config: AlbumsConfig,

    #[serde(default)]
    pub artists_config: ArtistsConfig,
}

/// Lyrics website endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Root of the lyrics website; target URLs must share its host
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Search endpoint
    #[serde(default = "default_search_url")]
    pub search_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_url: default_search_url(),
        }
    }
}

/// Song targets
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SongsConfig {
    #[serde(default)]
    pub skip: bool,

    #[serde(default)]
    pub targets: Vec<SongEntry>,
}

/// A song target, either `"title by artist"` or a table
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SongEntry {
    Query(String),
    Detailed(SongTarget),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SongTarget {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub artist: Option<String>,

    /// Lyrics page URL; skips the search step
    #[serde(default)]
    pub url: Option<String>,
}

impl SongEntry {
    /// Normalizes both spellings into a [`SongTarget`]
    pub fn to_target(&self) -> SongTarget {
        match self {
            Self::Detailed(target) => target.clone(),
            Self::Query(query) => split_title_by_artist(query),
        }
    }
}

/// Splits `"title by artist"` on the last `" by "`
pub fn split_title_by_artist(query: &str) -> SongTarget {
    let query = query.trim();
    match query.rsplit_once(" by ") {
        Some((title, artist)) if !artist.trim().is_empty() => SongTarget {
            title: title.trim().to_string(),
            artist: Some(artist.trim().to_string()),
            url: None,
        },
        _ => SongTarget {
            title: query.to_string(),
            artist: None,
            url: None,
        },
    }
}

/// Album targets
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlbumsConfig {
    #[serde(default)]
    pub skip: bool,

    #[serde(default)]
    pub targets: Vec<AlbumTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlbumTarget {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub artist: Option<String>,

    /// Artist page URL with the album anchor (`...#1234`)
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub max_songs: Option<usize>,

    #[serde(default)]
    pub choose_random: bool,
}

/// Artist targets
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtistsConfig {
    #[serde(default)]
    pub skip: bool,

    #[serde(default)]
    pub targets: Vec<ArtistTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtistTarget {
    #[serde(default)]
    pub name: String,

    /// Artist page URL; skips the search step
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub max_songs: Option<usize>,

    #[serde(default)]
    pub choose_random: bool,

    /// Inclusive lower bound on the song year
    #[serde(default)]
    pub year_after: Option<i32>,

    /// Inclusive upper bound on the song year
    #[serde(default)]
    pub year_before: Option<i32>,

    /// Keep songs without album/year ("other songs")
    #[serde(default)]
    pub include_unknown_year: bool,
}

impl Config {
    /// Web cache database location with `~/` expanded
    pub fn webcache_path(&self) -> PathBuf {
        expand_home(&self.webcache_dirpath).join("webcache.sqlite")
    }

    /// Music database location with `~/` expanded
    pub fn db_path(&self) -> PathBuf {
        expand_home(&self.db_filepath)
    }

    /// Number of targets across all non-skipped sections
    pub fn target_count(&self) -> usize {
        let mut count = 0;
        if !self.songs_config.skip {
            count += self.songs_config.targets.len();
        }
        if !self.albums_config.skip {
            count += self.albums_config.targets.len();
        }
        if !self.artists_config.skip {
            count += self.artists_config.targets.len();
        }
        count
    }
}

/// Expands a leading `~/` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn default_true() -> bool {
    true
}

fn default_db_filepath() -> String {
    "music.sqlite".to_string()
}

fn default_webcache_dirpath() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("lyrics_scraping").to_string_lossy().into_owned())
        .unwrap_or_else(|| "~/.cache/lyrics_scraping".to_string())
}

fn default_expire_after() -> u64 {
    300
}

fn default_ram_size() -> u64 {
    100
}

fn default_http_get_timeout() -> f64 {
    5.0
}

fn default_delay_between_requests() -> f64 {
    8.0
}

fn default_delay_interactive() -> f64 {
    30.0
}

fn default_seed() -> u64 {
    123456
}

fn default_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(
        "User-Agent".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Safari/605.1.15".to_string(),
    );
    headers.insert(
        "Accept".to_string(),
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
    );
    headers
}

fn default_base_url() -> String {
    "https://www.azlyrics.com/".to_string()
}

fn default_search_url() -> String {
    "https://search.azlyrics.com/search.php".to_string()
}
