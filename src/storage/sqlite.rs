//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::{initialize_schema, TABLES_CHILDREN_FIRST};
use crate::storage::traits::{Storage, StorageResult};
use crate::storage::{AlbumRecord, SongRecord, UrlKind, UrlRecord};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`, creating parent directories
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn insert_artist(conn: &Connection, name: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO artists (artist_name) VALUES (?1)",
        params![name],
    )?;
    Ok(())
}

fn upsert_album_row(
    conn: &Connection,
    title: &str,
    artist: &str,
    year: Option<i32>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO albums (album_title, artist_name, year) VALUES (?1, ?2, ?3)
         ON CONFLICT (album_title, artist_name) DO UPDATE SET year = COALESCE(albums.year, excluded.year)",
        params![title, artist, year],
    )?;
    Ok(())
}

/// A NULL album never matches a unique constraint, so the existing row is
/// looked up with `IS` before choosing between insert and update.
fn upsert_song_row(conn: &Connection, song: &SongRecord) -> rusqlite::Result<()> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT rowid FROM songs
             WHERE song_title = ?1 AND artist_name = ?2 AND album_title IS ?3",
            params![song.title, song.artist, song.album],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(rowid) => {
            conn.execute(
                "UPDATE songs SET lyrics = COALESCE(lyrics, ?1), year = COALESCE(year, ?2)
                 WHERE rowid = ?3",
                params![song.lyrics, song.year, rowid],
            )?;
        }
        None => {
            conn.execute(
                "INSERT INTO songs (song_title, artist_name, album_title, lyrics, year)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![song.title, song.artist, song.album, song.lyrics, song.year],
            )?;
        }
    }
    Ok(())
}

impl Storage for SqliteStorage {
    // ===== Entities =====

    fn upsert_artist(&mut self, name: &str) -> StorageResult<()> {
        insert_artist(&self.conn, name)?;
        Ok(())
    }

    fn upsert_album(
        &mut self,
        title: &str,
        artist: &str,
        year: Option<i32>,
    ) -> StorageResult<()> {
        upsert_album_row(&self.conn, title, artist, year)?;
        Ok(())
    }

    fn upsert_song(&mut self, song: &SongRecord) -> StorageResult<()> {
        upsert_song_row(&self.conn, song)?;
        Ok(())
    }

    fn save_song(&mut self, song: &SongRecord) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        insert_artist(&tx, &song.artist)?;
        if let Some(album) = &song.album {
            upsert_album_row(&tx, album, &song.artist, song.year)?;
        }
        upsert_song_row(&tx, song)?;
        tx.commit()?;
        Ok(())
    }

    fn record_url(
        &mut self,
        kind: UrlKind,
        url: &str,
        owner: Option<&str>,
        success: bool,
    ) -> StorageResult<()> {
        let sql = format!(
            "INSERT INTO {table} ({url_col}, {owner_col}, error_on_last_time, nb_requests)
             VALUES (?1, ?2, ?3, 1)
             ON CONFLICT ({url_col}) DO UPDATE SET
                 {owner_col} = COALESCE({table}.{owner_col}, excluded.{owner_col}),
                 error_on_last_time = excluded.error_on_last_time,
                 nb_requests = {table}.nb_requests + 1",
            table = kind.table(),
            url_col = kind.url_column(),
            owner_col = kind.owner_column(),
        );
        self.conn.execute(&sql, params![url, owner, !success])?;
        Ok(())
    }

    fn truncate(&mut self) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        for table in TABLES_CHILDREN_FIRST {
            tx.execute(&format!("DELETE FROM {}", table), [])?;
        }
        tx.commit()?;
        Ok(())
    }

    // ===== Reads =====

    fn get_song(
        &self,
        title: &str,
        artist: &str,
        album: Option<&str>,
    ) -> StorageResult<Option<SongRecord>> {
        let song = self
            .conn
            .query_row(
                "SELECT song_title, artist_name, album_title, lyrics, year FROM songs
                 WHERE song_title = ?1 AND artist_name = ?2 AND album_title IS ?3",
                params![title, artist, album],
                |row| {
                    Ok(SongRecord {
                        title: row.get(0)?,
                        artist: row.get(1)?,
                        album: row.get(2)?,
                        lyrics: row.get(3)?,
                        year: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(song)
    }

    fn get_album(&self, title: &str, artist: &str) -> StorageResult<Option<AlbumRecord>> {
        let album = self
            .conn
            .query_row(
                "SELECT album_title, artist_name, year FROM albums
                 WHERE album_title = ?1 AND artist_name = ?2",
                params![title, artist],
                |row| {
                    Ok(AlbumRecord {
                        title: row.get(0)?,
                        artist: row.get(1)?,
                        year: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(album)
    }

    fn get_url_record(&self, kind: UrlKind, url: &str) -> StorageResult<Option<UrlRecord>> {
        let sql = format!(
            "SELECT {url_col}, {owner_col}, error_on_last_time, nb_requests FROM {table}
             WHERE {url_col} = ?1",
            table = kind.table(),
            url_col = kind.url_column(),
            owner_col = kind.owner_column(),
        );
        let record = self
            .conn
            .query_row(&sql, params![url], |row| {
                Ok(UrlRecord {
                    url: row.get(0)?,
                    owner: row.get(1)?,
                    error_on_last_time: row.get(2)?,
                    nb_requests: row.get(3)?,
                })
            })
            .optional()?;
        Ok(record)
    }

    fn list_songs(&self) -> StorageResult<Vec<SongRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT song_title, artist_name, album_title, lyrics, year FROM songs
             ORDER BY artist_name, album_title, song_title",
        )?;

        let songs = stmt
            .query_map([], |row| {
                Ok(SongRecord {
                    title: row.get(0)?,
                    artist: row.get(1)?,
                    album: row.get(2)?,
                    lyrics: row.get(3)?,
                    year: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(songs)
    }

    // ===== Statistics =====

    fn count_artists(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM artists")
    }

    fn count_albums(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM albums")
    }

    fn count_songs(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM songs")
    }

    fn count_songs_with_lyrics(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM songs WHERE lyrics IS NOT NULL")
    }

    fn count_urls(&self, kind: UrlKind) -> StorageResult<u64> {
        self.count(&format!("SELECT COUNT(*) FROM {}", kind.table()))
    }

    fn count_failed_urls(&self, kind: UrlKind) -> StorageResult<u64> {
        self.count(&format!(
            "SELECT COUNT(*) FROM {} WHERE error_on_last_time = 1",
            kind.table()
        ))
    }
}
