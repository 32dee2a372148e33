//! Database schema definitions
//!
//! This module contains the SQL schema of the music database.

/// SQL schema for the music database
///
/// `albums_urls.album_title` and `songs_urls.song_title` carry no SQL foreign
/// key: their owners have composite keys and SQLite cannot reference a single
/// column of one. The owner columns of every URL table are nullable because a
/// URL row is written on the first fetch attempt, before its owner may exist.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS artists (
    artist_name TEXT NOT NULL PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS artists_urls (
    artist_url TEXT NOT NULL PRIMARY KEY,
    artist_name TEXT REFERENCES artists(artist_name),
    error_on_last_time INTEGER NOT NULL DEFAULT 0,
    nb_requests INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS albums (
    album_title TEXT NOT NULL,
    artist_name TEXT NOT NULL REFERENCES artists(artist_name),
    year INTEGER,
    PRIMARY KEY (album_title, artist_name)
);

CREATE TABLE IF NOT EXISTS albums_urls (
    album_url TEXT NOT NULL PRIMARY KEY,
    album_title TEXT,
    error_on_last_time INTEGER NOT NULL DEFAULT 0,
    nb_requests INTEGER NOT NULL DEFAULT 0
);

-- album_title is NULL for songs listed outside any album
CREATE TABLE IF NOT EXISTS songs (
    song_title TEXT NOT NULL,
    artist_name TEXT NOT NULL REFERENCES artists(artist_name),
    album_title TEXT,
    lyrics TEXT,
    year INTEGER,
    PRIMARY KEY (song_title, artist_name, album_title),
    FOREIGN KEY (album_title, artist_name) REFERENCES albums(album_title, artist_name)
);

CREATE INDEX IF NOT EXISTS idx_songs_artist ON songs(artist_name);

CREATE TABLE IF NOT EXISTS songs_urls (
    song_url TEXT NOT NULL PRIMARY KEY,
    song_title TEXT,
    error_on_last_time INTEGER NOT NULL DEFAULT 0,
    nb_requests INTEGER NOT NULL DEFAULT 0
);
"#;

/// Child tables first so foreign keys never block the deletes
pub const TABLES_CHILDREN_FIRST: [&str; 6] = [
    "songs_urls",
    "songs",
    "albums_urls",
    "albums",
    "artists_urls",
    "artists",
];

/// Initializes the database schema
///
/// Creates all tables and indexes if they don't exist.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
