//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{AlbumRecord, SongRecord, UrlKind, UrlRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every upsert is idempotent: an existing row keyed by its natural key only
/// has its NULL fields filled, non-NULL values are never overwritten.
pub trait Storage {
    // ===== Entities =====

    /// Inserts the artist unless it already exists
    fn upsert_artist(&mut self, name: &str) -> StorageResult<()>;

    /// Inserts the album or fills its missing year
    ///
    /// The artist row must already exist.
    fn upsert_album(&mut self, title: &str, artist: &str, year: Option<i32>)
        -> StorageResult<()>;

    /// Inserts the song or fills its missing lyrics and year
    ///
    /// The artist row (and the album row, when `album` is set) must already
    /// exist.
    fn upsert_song(&mut self, song: &SongRecord) -> StorageResult<()>;

    /// Upserts artist, album and song in one transaction, parents first
    fn save_song(&mut self, song: &SongRecord) -> StorageResult<()>;

    /// Records one fetch attempt of a source URL
    ///
    /// Creates the row on first sight, then flips the error flag to the
    /// latest outcome and bumps the request counter. A known owner is never
    /// replaced.
    fn record_url(
        &mut self,
        kind: UrlKind,
        url: &str,
        owner: Option<&str>,
        success: bool,
    ) -> StorageResult<()>;

    /// Empties every table
    fn truncate(&mut self) -> StorageResult<()>;

    // ===== Reads =====

    fn get_song(
        &self,
        title: &str,
        artist: &str,
        album: Option<&str>,
    ) -> StorageResult<Option<SongRecord>>;

    fn get_album(&self, title: &str, artist: &str) -> StorageResult<Option<AlbumRecord>>;

    fn get_url_record(&self, kind: UrlKind, url: &str) -> StorageResult<Option<UrlRecord>>;

    /// All songs ordered by artist, album and title
    fn list_songs(&self) -> StorageResult<Vec<SongRecord>>;

    // ===== Statistics =====

    fn count_artists(&self) -> StorageResult<u64>;

    fn count_albums(&self) -> StorageResult<u64>;

    fn count_songs(&self) -> StorageResult<u64>;

    /// Number of songs stored with lyrics text
    fn count_songs_with_lyrics(&self) -> StorageResult<u64>;

    fn count_urls(&self, kind: UrlKind) -> StorageResult<u64>;

    /// Number of URLs whose last fetch attempt failed
    fn count_failed_urls(&self, kind: UrlKind) -> StorageResult<u64>;
}
