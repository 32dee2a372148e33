//! Lyrics website backends
//!
//! A [`LyricsSite`] knows how to build search URLs for one website and how to
//! turn its pages into structured data. The crawler never looks at HTML
//! directly.

mod azlyrics;

pub use azlyrics::AzLyrics;

use crate::cache::Weigh;
use crate::Result;
use std::fmt;
use url::Url;

/// What a target (or a search) is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Song,
    Album,
    Artist,
}

impl TargetKind {
    /// Value of the search scope parameter
    pub fn search_scope(&self) -> &'static str {
        match self {
            Self::Song => "songs",
            Self::Album => "albums",
            Self::Artist => "artists",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Song => "song",
            Self::Album => "album",
            Self::Artist => "artist",
        };
        write!(f, "{}", name)
    }
}

/// Page kind of a site URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// Lyrics page of a single song
    Song,
    /// Artist page, optionally narrowed to one album by its anchor
    Artist { album_id: Option<String> },
}

/// One search result in listing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Display text, e.g. `"New Life by Depeche Mode"`
    pub text: String,
    pub url: String,
}

/// Album header on an artist page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumHeader {
    /// Anchor id used by album URLs (`artist.html#<id>`)
    pub id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSong {
    pub title: String,
    pub url: String,
}

/// Songs listed under one album header, or under "other songs" when
/// `album` is `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSection {
    pub album: Option<AlbumHeader>,
    pub songs: Vec<CatalogSong>,
}

/// Parsed artist page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistPage {
    pub artist: String,
    pub sections: Vec<CatalogSection>,
}

impl ArtistPage {
    /// The section of the album with anchor `album_id`
    pub fn album_section(&self, album_id: &str) -> Option<&CatalogSection> {
        self.sections.iter().find(|section| {
            section
                .album
                .as_ref()
                .and_then(|album| album.id.as_deref())
                == Some(album_id)
        })
    }

    /// Total number of songs listed, "other songs" included
    pub fn song_count(&self) -> usize {
        self.sections.iter().map(|section| section.songs.len()).sum()
    }
}

/// Parsed lyrics page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongPage {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub lyrics: String,
}

/// A parsed page as kept in the compute cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPage {
    Artist(ArtistPage),
    Song(SongPage),
}

/// A lyrics website
pub trait LyricsSite {
    fn name(&self) -> &str;

    /// Search page URL for `query` restricted to `kind`
    fn search_url(&self, kind: TargetKind, query: &str) -> Result<Url>;

    /// Search results in listing order; an empty page yields an empty list
    fn parse_search_results(&self, kind: TargetKind, page_url: &Url, html: &str)
        -> Result<Vec<Candidate>>;

    fn parse_artist_page(&self, page_url: &Url, html: &str) -> Result<ArtistPage>;

    fn parse_song_page(&self, page_url: &Url, html: &str) -> Result<SongPage>;

    /// Parses `url`, checks it belongs to this site and tells its page kind
    fn classify_url(&self, url: &str) -> Result<(Url, PageKind)>;
}

impl Weigh for Candidate {
    fn weight(&self) -> usize {
        self.text.weight() + self.url.weight()
    }
}

impl Weigh for CatalogSong {
    fn weight(&self) -> usize {
        self.title.weight() + self.url.weight()
    }
}

impl Weigh for CatalogSection {
    fn weight(&self) -> usize {
        let header = self
            .album
            .as_ref()
            .map_or(0, |album| album.title.weight() + album.id.weight());
        header + self.songs.weight()
    }
}

impl Weigh for ParsedPage {
    fn weight(&self) -> usize {
        match self {
            Self::Artist(page) => page.artist.weight() + page.sections.weight(),
            Self::Song(page) => {
                page.title.weight()
                    + page.artist.weight()
                    + page.album.weight()
                    + page.lyrics.weight()
            }
        }
    }
}
