//! Storage module for persisting scraped music data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Idempotent artist, album and song upserts in foreign-key order
//! - Per-URL crawl metadata (error flag and request counter)

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::fmt;
use std::path::Path;

/// Opens (or creates) the music database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A song row together with the keys of its parents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRecord {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub lyrics: Option<String>,
    pub year: Option<i32>,
}

/// An album row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumRecord {
    pub title: String,
    pub artist: String,
    pub year: Option<i32>,
}

/// Crawl metadata of one source URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub url: String,
    pub owner: Option<String>,
    pub error_on_last_time: bool,
    pub nb_requests: u32,
}

/// Which URL table a source URL belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlKind {
    Artist,
    Album,
    Song,
}

impl UrlKind {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::Artist => "artists_urls",
            Self::Album => "albums_urls",
            Self::Song => "songs_urls",
        }
    }

    pub(crate) fn url_column(&self) -> &'static str {
        match self {
            Self::Artist => "artist_url",
            Self::Album => "album_url",
            Self::Song => "song_url",
        }
    }

    pub(crate) fn owner_column(&self) -> &'static str {
        match self {
            Self::Artist => "artist_name",
            Self::Album => "album_title",
            Self::Song => "song_title",
        }
    }
}

impl fmt::Display for UrlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Song => "song",
        };
        write!(f, "{}", name)
    }
}
